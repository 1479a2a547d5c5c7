//! Request dispatch.
//!
//! # Data Flow
//! ```text
//! ApiRequest
//!     → RequestContext::new (normalize path, verb, version)
//!     → Start
//!     → FormatResolved   (response format, then request format)     415
//!     → BodyParsed       (PUT/PATCH/POST bodies)                      400
//!     → RouteMatched     (first matching route, argument binding)     404
//!     → Authenticated    (protected routes only)                      401
//!     → PreProcessed     (_{ext}_{method} hook)
//!     → Invoked          (handler call)                               any
//!     → Responded        (responder, encoding, _{method}_{ext} hook)
//!                                    │
//!         any RestError ─────────────┴──► ErrorHandled (error handlers or envelope)
//! ```
//!
//! # Design Decisions
//! - Routes, formats and classes are fixed when the builder is consumed;
//!   a [`Dispatcher`] is shared across tasks behind an `Arc`
//! - Every client or domain error still yields a response encoded in the
//!   negotiated format
//! - Unexpected handler failures are not turned into API errors; they
//!   leave [`Dispatcher::dispatch`] as [`DispatchError`]

pub mod context;
pub mod response;
pub mod status;

use std::sync::Arc;
use std::time::Instant;

use serde_json::{Map, Value};

use crate::api::{
    ApiClass, ApiHandler, ClassRegistry, DefaultResponder, ErrorHandler, Responder,
};
use crate::config::ApiConfig;
use crate::error::{CallError, ConfigError, DispatchError, RestError};
use crate::format::{Format, FormatRegistry, JsonFormat};
use crate::observability::metrics;
use crate::routing::{Access, CallDescriptor, RouteCache, RouteCompiler, RouteTable, REQUEST_DATA};

pub use context::{ApiRequest, RequestContext, Stage, METHOD_OVERRIDE, X_REQUEST_ID};
pub use response::ApiResponse;
pub use status::reason_phrase;

/// Value of the `X-Powered-By` header.
pub const POWERED_BY: &str = concat!("docrest v", env!("CARGO_PKG_VERSION"));

/// Why a request left the happy path.
enum Interrupt {
    Rest(RestError),
    Unexpected(DispatchError),
}

impl From<RestError> for Interrupt {
    fn from(err: RestError) -> Self {
        Interrupt::Rest(err)
    }
}

fn call_failure(call: &CallDescriptor, method: &str, err: CallError) -> Interrupt {
    match err {
        CallError::Rest(err) => Interrupt::Rest(err),
        CallError::Unexpected(source) => Interrupt::Unexpected(DispatchError::Unexpected {
            class: call.class_name.clone(),
            method: method.to_string(),
            source,
        }),
    }
}

/// Assembles a [`Dispatcher`].
///
/// Nothing is compiled until [`build`](Self::build).
pub struct DispatcherBuilder {
    config: ApiConfig,
    formats: Vec<Vec<Arc<dyn Format>>>,
    classes: ClassRegistry,
    mounts: Vec<(String, Option<String>)>,
    authenticators: Vec<String>,
    error_handlers: Vec<Arc<dyn ErrorHandler>>,
    responder: Option<Arc<dyn Responder>>,
}

impl DispatcherBuilder {
    pub fn new(config: ApiConfig) -> Self {
        Self {
            config,
            formats: Vec::new(),
            classes: ClassRegistry::new(),
            mounts: Vec::new(),
            authenticators: Vec::new(),
            error_handlers: Vec::new(),
            responder: None,
        }
    }

    /// Register formats. The first format of the first call is the default.
    /// Without any call, JSON is the only format.
    pub fn formats(mut self, formats: Vec<Arc<dyn Format>>) -> Self {
        self.formats.push(formats);
        self
    }

    /// Make `class` available under `identifier` without routing it.
    pub fn register_class(mut self, identifier: impl Into<String>, class: Arc<dyn ApiClass>) -> Self {
        self.classes.register(identifier, class);
        self
    }

    /// Route the class registered as `identifier`. Without `base_path`,
    /// the lowercase identifier is used.
    pub fn api_class(mut self, identifier: impl Into<String>, base_path: Option<&str>) -> Self {
        self.mounts
            .push((identifier.into(), base_path.map(str::to_string)));
        self
    }

    /// Route the class registered as `identifier` and consult it, in
    /// registration order, before any protected method runs.
    pub fn authentication_class(self, identifier: impl Into<String>, base_path: Option<&str>) -> Self {
        let identifier = identifier.into();
        let mut builder = self.api_class(identifier.clone(), base_path);
        builder.authenticators.push(identifier);
        builder
    }

    pub fn error_handler(mut self, handler: Arc<dyn ErrorHandler>) -> Self {
        self.error_handlers.push(handler);
        self
    }

    /// Replace [`DefaultResponder`].
    pub fn responder(mut self, responder: Arc<dyn Responder>) -> Self {
        self.responder = Some(responder);
        self
    }

    /// Register formats, then compile routes or load them from the cache.
    pub fn build(self) -> Result<Dispatcher, ConfigError> {
        let mut formats = FormatRegistry::new();
        if self.formats.is_empty() {
            formats.register_formats(vec![Arc::new(JsonFormat)])?;
        }
        for batch in self.formats {
            formats.register_formats(batch)?;
        }

        for (identifier, _) in &self.mounts {
            self.classes.require(identifier)?;
        }

        let cache = RouteCache::new(self.config.cache_dir());
        let cached = if self.config.production_mode && !self.config.refresh_cache {
            cache.load()
        } else {
            None
        };

        let routes = match cached {
            Some(routes) => {
                metrics::record_route_cache("hit");
                routes
            }
            None => {
                let compiler = RouteCompiler::new(self.config.compatibility_mode);
                let mut routes = RouteTable::new();
                for (identifier, base_path) in &self.mounts {
                    compiler.compile(&self.classes, identifier, base_path.as_deref(), &mut routes)?;
                }
                if self.config.production_mode {
                    cache.save(&routes)?;
                    metrics::record_route_cache("miss");
                }
                routes
            }
        };

        tracing::info!(
            routes = routes.len(),
            classes = self.classes.len(),
            production_mode = self.config.production_mode,
            "Dispatcher ready"
        );

        Ok(Dispatcher {
            config: self.config,
            formats,
            classes: self.classes,
            routes,
            authenticators: self.authenticators,
            error_handlers: self.error_handlers,
            responder: self
                .responder
                .unwrap_or_else(|| Arc::new(DefaultResponder)),
        })
    }
}

/// Routes requests to API class methods.
pub struct Dispatcher {
    config: ApiConfig,
    formats: FormatRegistry,
    classes: ClassRegistry,
    routes: RouteTable,
    authenticators: Vec<String>,
    error_handlers: Vec<Arc<dyn ErrorHandler>>,
    responder: Arc<dyn Responder>,
}

impl Dispatcher {
    pub fn builder(config: ApiConfig) -> DispatcherBuilder {
        DispatcherBuilder::new(config)
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn formats(&self) -> &FormatRegistry {
        &self.formats
    }

    /// Serve one request.
    pub fn dispatch(&self, request: ApiRequest) -> Result<ApiResponse, DispatchError> {
        let started = Instant::now();
        let mut ctx = RequestContext::new(request, &self.config, self.formats.extensions());

        tracing::debug!(
            request_id = %ctx.request_id,
            method = %ctx.method,
            path = %ctx.path,
            "Dispatching request"
        );

        let response = match self.invoke(&mut ctx) {
            Ok((handler, result)) => self.respond(&mut ctx, handler, result),
            Err(Interrupt::Rest(err)) => self.handle_error(&mut ctx, err),
            Err(Interrupt::Unexpected(err)) => {
                tracing::error!(
                    request_id = %ctx.request_id,
                    stage = %ctx.stage,
                    error = ?err,
                    "Unexpected failure"
                );
                metrics::record_request(ctx.verb, 500, ctx.route().unwrap_or("none"), started);
                return Err(err);
            }
        };

        metrics::record_request(
            ctx.verb,
            response.status,
            ctx.route().unwrap_or("none"),
            started,
        );
        Ok(response)
    }

    /// Run every stage up to and including the handler call.
    fn invoke(
        &self,
        ctx: &mut RequestContext,
    ) -> Result<(Box<dyn ApiHandler>, Value), Interrupt> {
        self.resolve_formats(ctx)?;
        self.parse_body(ctx)?;
        let call = self.match_route(ctx)?;
        self.authenticate(ctx, &call)?;

        let class = self.classes.get(&call.class_name).ok_or_else(|| {
            Interrupt::Unexpected(DispatchError::Unexpected {
                class: call.class_name.clone(),
                method: call.method_name.clone(),
                source: anyhow::anyhow!("API class {} is not registered", call.class_name),
            })
        })?;
        let mut handler = class.instantiate(ctx);
        if let Some(config) = call.metadata.class_config(&call.class_name) {
            handler.configure(config);
        }

        let extension = ctx
            .response_format
            .as_ref()
            .map(|f| f.extension().to_string())
            .unwrap_or_default();
        let hook = format!("_{}_{}", extension, call.method_name);
        if handler.has_method(&hook) {
            tracing::debug!(request_id = %ctx.request_id, hook = %hook, "Running pre-process hook");
            handler
                .call(&hook, &ctx.arguments)
                .map_err(|e| call_failure(&call, &hook, e))?;
        }
        ctx.advance(Stage::PreProcessed);

        let result = match call.access {
            Access::ProtectedReflective => handler.call_protected(&call.method_name, &ctx.arguments),
            _ => handler.call(&call.method_name, &ctx.arguments),
        }
        .map_err(|e| call_failure(&call, &call.method_name, e))?;
        ctx.advance(Stage::Invoked);

        Ok((handler, result))
    }

    fn resolve_formats(&self, ctx: &mut RequestContext) -> Result<(), RestError> {
        let response = self
            .formats
            .resolve_response(&ctx.uri_path, ctx.header("accept"));
        let request = self
            .formats
            .resolve_request(ctx.header("content-type"), &response);
        ctx.response_format = Some(response);
        ctx.request_format = Some(request?);
        ctx.advance(Stage::FormatResolved);
        Ok(())
    }

    fn parse_body(&self, ctx: &mut RequestContext) -> Result<(), RestError> {
        if ctx.verb.is_some_and(|verb| verb.has_body()) {
            if let Some(format) = &ctx.request_format {
                let decoded = format.decode(&ctx.body)?;
                ctx.request_data = match decoded {
                    Value::Object(body) => {
                        let mut merged = ctx.query.clone();
                        merged.extend(body);
                        Value::Object(merged)
                    }
                    Value::Null => Value::Object(ctx.query.clone()),
                    other => other,
                };
            }
        }
        ctx.advance(Stage::BodyParsed);
        Ok(())
    }

    fn match_route(&self, ctx: &mut RequestContext) -> Result<Arc<CallDescriptor>, RestError> {
        let verb = ctx.verb.ok_or_else(RestError::not_found)?;
        let found = self
            .routes
            .find(verb, &ctx.path)
            .ok_or_else(RestError::not_found)?;
        let call = Arc::clone(found.call);

        let mut params: Map<String, Value> = match &ctx.request_data {
            Value::Object(data) => data.clone(),
            _ => ctx.query.clone(),
        };
        params.insert(REQUEST_DATA.to_string(), ctx.request_data.clone());
        for (name, value) in found.captures {
            if call.arguments.contains_key(&name) {
                params.insert(name, Value::String(value));
            }
        }

        let mut arguments = call.defaults.clone();
        for (name, &position) in &call.arguments {
            if let Some(value) = params.get(name).filter(|v| !v.is_null()) {
                if let Some(slot) = arguments.get_mut(position) {
                    *slot = value.clone();
                }
            }
        }

        tracing::debug!(
            request_id = %ctx.request_id,
            verb = %verb,
            pattern = %found.pattern,
            class = %call.class_name,
            method = %call.method_name,
            "Matched route"
        );
        ctx.route = Some(found.pattern.to_string());
        ctx.arguments = arguments;
        ctx.call = Some(Arc::clone(&call));
        ctx.advance(Stage::RouteMatched);
        Ok(call)
    }

    fn authenticate(&self, ctx: &mut RequestContext, call: &CallDescriptor) -> Result<(), RestError> {
        if !call.access.requires_authentication() {
            return Ok(());
        }
        if self.authenticators.is_empty() {
            return Err(RestError::unauthorized());
        }
        for identifier in &self.authenticators {
            let class = self.classes.get(identifier).ok_or_else(RestError::unauthorized)?;
            let mut handler = class.instantiate(ctx);
            if let Some(config) = call.metadata.class_config(identifier) {
                handler.configure(config);
            }
            let Some(authenticator) = handler.as_authenticator() else {
                return Err(RestError::with_message(
                    401,
                    format!("Authentication class {} should implement Authenticator", identifier),
                ));
            };
            if !authenticator.is_authenticated(ctx) {
                tracing::debug!(request_id = %ctx.request_id, authenticator = %identifier, "Authentication refused");
                return Err(RestError::unauthorized());
            }
        }
        ctx.advance(Stage::Authenticated);
        Ok(())
    }

    fn respond(
        &self,
        ctx: &mut RequestContext,
        mut handler: Box<dyn ApiHandler>,
        result: Value,
    ) -> ApiResponse {
        let shaped = self.responder.format_success(result, ctx);
        let mut body = match (&shaped, &ctx.response_format) {
            (Value::Null, _) | (_, None) => Vec::new(),
            (data, Some(format)) => format.encode(data, !self.config.production_mode),
        };

        if let (Some(call), Some(format)) = (&ctx.call, &ctx.response_format) {
            let hook = format!("_{}_{}", call.method_name, format.extension());
            if handler.has_method(&hook) {
                tracing::debug!(request_id = %ctx.request_id, hook = %hook, "Running post-process hook");
                body = handler.post_process(&hook, body);
            }
        }

        let status = ctx
            .call
            .as_ref()
            .and_then(|call| call.metadata.status.as_ref())
            .map(|status| status.code)
            .filter(|&code| status::reason_phrase(code).is_some())
            .unwrap_or(200);
        let mut response = self.new_response(ctx, status);
        response.set_body(body);
        ctx.advance(Stage::Responded);
        response
    }

    fn handle_error(&self, ctx: &mut RequestContext, err: RestError) -> ApiResponse {
        tracing::warn!(
            request_id = %ctx.request_id,
            stage = %ctx.stage,
            code = err.code,
            message = err.message.as_deref().unwrap_or_default(),
            "Request failed"
        );
        ctx.error = Some(err.clone());
        ctx.advance(Stage::ErrorHandled);

        let mut response = self.new_response(ctx, err.code);
        let handlers: Vec<_> = self
            .error_handlers
            .iter()
            .filter(|handler| handler.handles(err.code))
            .collect();
        if !handlers.is_empty() {
            for handler in handlers {
                handler.handle(err.code, ctx, &mut response);
            }
            return response;
        }

        let message = status::error_message(err.code, err.message.as_deref());
        let envelope = self.responder.format_error(err.code, &message, ctx);
        if let Some(format) = &ctx.response_format {
            response.set_body(format.encode(&envelope, !self.config.production_mode));
        }
        response
    }

    /// A response carrying the standard headers and `@header` directives.
    fn new_response(&self, ctx: &RequestContext, status: u16) -> ApiResponse {
        let status = if ctx.suppress_response_codes() { 200 } else { status };
        let mut response = ApiResponse::new(status);
        response.set_header("Cache-Control", "no-cache, must-revalidate");
        response.set_header("Expires", "0");
        let content_type = self
            .responder
            .content_type(ctx)
            .or_else(|| ctx.response_format.as_ref().map(|f| f.mime().to_string()));
        if let Some(content_type) = content_type {
            response.set_header("Content-Type", content_type);
        }
        response.set_header("X-Powered-By", POWERED_BY);

        if let Some(call) = &ctx.call {
            for header in &call.metadata.headers {
                if let Some((name, value)) = header.split_once(':') {
                    response.set_header(name.trim(), value.trim());
                }
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_powered_by() {
        assert!(POWERED_BY.starts_with("docrest v"));
    }

    #[test]
    fn test_empty_format_batch_is_rejected() {
        let err = Dispatcher::builder(ApiConfig::default())
            .formats(Vec::new())
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::InvalidFormat(_)));
    }

    #[test]
    fn test_unknown_api_class_is_rejected() {
        let err = Dispatcher::builder(ApiConfig::default())
            .api_class("Users", None)
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::MissingClass(name) if name == "Users"));
    }

    #[test]
    fn test_unmatched_request_without_classes() {
        let dispatcher = Dispatcher::builder(ApiConfig::default()).build().unwrap();
        let response = dispatcher.dispatch(ApiRequest::get("/anything")).unwrap();

        assert_eq!(response.status, 404);
        assert_eq!(response.header("Content-Type"), Some("application/json"));
        assert_eq!(response.header("X-Powered-By"), Some(POWERED_BY));
        let body: Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body["error"]["message"], "Not Found");
    }
}
