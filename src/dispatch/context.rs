//! Per-request state.
//!
//! # Responsibilities
//! - Normalize the request: mount prefix, URL decoding, format extensions,
//!   API version prefix, verb overrides
//! - Carry everything the dispatch stages produce (formats, route,
//!   arguments, error) and expose it read-only to collaborators
//!
//! # Design Decisions
//! - One context per request; nothing per-request is shared
//! - Collaborators see `&RequestContext`; only the dispatcher mutates it

use std::fmt;
use std::sync::Arc;

use axum::body::Bytes;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde_json::{Map, Value};
use url::form_urlencoded;
use uuid::Uuid;

use crate::config::ApiConfig;
use crate::error::RestError;
use crate::format::urlencoded::decode_pairs;
use crate::format::FormatBinding;
use crate::routing::CallDescriptor;
use crate::verb::Verb;

/// Header carrying the effective verb for clients limited to GET/POST.
pub const METHOD_OVERRIDE: &str = "x-http-method-override";

/// Correlation header set by the HTTP layer.
pub const X_REQUEST_ID: &str = "x-request-id";

/// An incoming request, independent of the transport.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path and query, e.g. `/users/42?format=full`.
    pub uri: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ApiRequest {
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn get(uri: impl Into<String>) -> Self {
        Self::new(Method::GET, uri)
    }

    pub fn post(uri: impl Into<String>) -> Self {
        Self::new(Method::POST, uri)
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }
}

/// Dispatch progress of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    FormatResolved,
    BodyParsed,
    RouteMatched,
    Authenticated,
    PreProcessed,
    Invoked,
    Responded,
    ErrorHandled,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Start => "start",
            Stage::FormatResolved => "format_resolved",
            Stage::BodyParsed => "body_parsed",
            Stage::RouteMatched => "route_matched",
            Stage::Authenticated => "authenticated",
            Stage::PreProcessed => "pre_processed",
            Stage::Invoked => "invoked",
            Stage::Responded => "responded",
            Stage::ErrorHandled => "error_handled",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of one request as it moves through the dispatcher.
#[derive(Debug)]
pub struct RequestContext {
    pub(crate) request_id: Uuid,
    pub(crate) method: String,
    pub(crate) verb: Option<Verb>,
    pub(crate) uri_path: String,
    pub(crate) path: String,
    pub(crate) query: Map<String, Value>,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) requested_version: u32,
    pub(crate) production_mode: bool,
    pub(crate) response_format: Option<FormatBinding>,
    pub(crate) request_format: Option<FormatBinding>,
    pub(crate) request_data: Value,
    pub(crate) call: Option<Arc<CallDescriptor>>,
    pub(crate) route: Option<String>,
    pub(crate) arguments: Vec<Value>,
    pub(crate) stage: Stage,
    pub(crate) error: Option<RestError>,
}

impl RequestContext {
    /// Build the context for `request`. `extensions` are the registered
    /// format extensions, stripped from the routing path.
    pub fn new(request: ApiRequest, config: &ApiConfig, extensions: &[String]) -> Self {
        let (uri_path, query_string) = match request.uri.split_once('?') {
            Some((path, query)) => (path, query),
            None => (request.uri.as_str(), ""),
        };
        let query = decode_pairs(query_string.as_bytes());

        let path = url_decode(strip_mount(uri_path, &config.mount_path));
        let path = strip_extensions(path.trim_matches('/'), extensions);
        let (path, requested_version) = strip_version(path.trim_matches('/'), config.api_version);

        let method = effective_method(&request.method, &request.headers, &query);
        let verb = method.parse::<Verb>().ok();
        let request_id = request
            .headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v).ok())
            .unwrap_or_else(Uuid::new_v4);

        Self {
            request_id,
            method,
            verb,
            uri_path: uri_path.to_string(),
            path,
            request_data: Value::Object(query.clone()),
            query,
            headers: request.headers,
            body: request.body,
            requested_version,
            production_mode: config.production_mode,
            response_format: None,
            request_format: None,
            call: None,
            route: None,
            arguments: Vec::new(),
            stage: Stage::Start,
            error: None,
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Effective method name, after overrides. HEAD reads as GET.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The effective method, when it is one the router knows.
    pub fn verb(&self) -> Option<Verb> {
        self.verb
    }

    /// Request path as received, without the query string.
    pub fn uri_path(&self) -> &str {
        &self.uri_path
    }

    /// Normalized routing path, e.g. `users/42`.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &Map<String, Value> {
        &self.query
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).and_then(Value::as_str)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// API version the request asked for (0 when versioning is off).
    pub fn requested_version(&self) -> u32 {
        self.requested_version
    }

    pub fn is_production(&self) -> bool {
        self.production_mode
    }

    pub fn response_format(&self) -> Option<&FormatBinding> {
        self.response_format.as_ref()
    }

    pub fn request_format(&self) -> Option<&FormatBinding> {
        self.request_format.as_ref()
    }

    /// Decoded body merged over the query parameters, or the decoded body
    /// itself when it is not an object.
    pub fn request_data(&self) -> &Value {
        &self.request_data
    }

    pub fn call(&self) -> Option<&Arc<CallDescriptor>> {
        self.call.as_ref()
    }

    /// Pattern of the matched route.
    pub fn route(&self) -> Option<&str> {
        self.route.as_deref()
    }

    /// Final positional arguments of the matched method.
    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn error(&self) -> Option<&RestError> {
        self.error.as_ref()
    }

    /// `?suppress_response_codes=true` asks for status 200 on every response.
    pub fn suppress_response_codes(&self) -> bool {
        self.query_param("suppress_response_codes") == Some("true")
    }

    pub(crate) fn advance(&mut self, stage: Stage) {
        tracing::trace!(
            request_id = %self.request_id,
            from = %self.stage,
            to = %stage,
            "Dispatch stage"
        );
        self.stage = stage;
    }
}

fn strip_mount<'a>(path: &'a str, mount_path: &str) -> &'a str {
    let mount = mount_path.trim_end_matches('/');
    if mount.is_empty() {
        return path;
    }
    match path.strip_prefix(mount) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => path,
    }
}

/// Percent-decode, with `+` as space.
fn url_decode(input: &str) -> String {
    let escaped = input.replace('&', "%26").replace('=', "%3D");
    form_urlencoded::parse(escaped.as_bytes())
        .next()
        .map(|(decoded, _)| decoded.into_owned())
        .unwrap_or_default()
}

/// Remove `.ext` tokens that end a segment.
fn strip_extensions(path: &str, extensions: &[String]) -> String {
    let mut path = path.to_string();
    for extension in extensions {
        let token = format!(".{}", extension);
        let mut stripped = String::with_capacity(path.len());
        let mut rest = path.as_str();
        while let Some(index) = rest.find(&token) {
            let after = &rest[index + token.len()..];
            stripped.push_str(&rest[..index]);
            if !(after.is_empty() || after.starts_with('/')) {
                stripped.push_str(&token);
            }
            rest = after;
        }
        stripped.push_str(rest);
        path = stripped;
    }
    path
}

fn strip_version(path: &str, api_version: u32) -> (String, u32) {
    if api_version == 0 {
        return (path.to_string(), 0);
    }
    let (head, rest) = path.split_once('/').unwrap_or((path, ""));
    let requested = head
        .strip_prefix('v')
        .and_then(|n| n.parse::<u32>().ok())
        .filter(|&n| n > 0 && n <= api_version);
    match requested {
        Some(version) => (rest.to_string(), version),
        None => (path.to_string(), api_version),
    }
}

fn effective_method(method: &Method, headers: &HeaderMap, query: &Map<String, Value>) -> String {
    let overridden = headers
        .get(METHOD_OVERRIDE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_ascii_uppercase())
        .or_else(|| {
            let requested = query.get("method")?.as_str()?.to_ascii_uppercase();
            matches!(requested.as_str(), "PUT" | "DELETE" | "POST" | "PATCH").then_some(requested)
        });
    let method = overridden.unwrap_or_else(|| method.as_str().to_ascii_uppercase());
    if method == "HEAD" {
        "GET".to_string()
    } else {
        method
    }
}
