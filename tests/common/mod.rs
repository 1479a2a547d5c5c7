//! Shared fixtures for integration testing.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use serde_json::{json, Value};

use docrest::api::{ApiClass, ApiHandler, Authenticator, ErrorHandler, MethodInfo};
use docrest::config::ApiConfig;
use docrest::dispatch::{ApiResponse, Dispatcher, DispatcherBuilder, RequestContext};
use docrest::metadata::ClassConfig;
use docrest::{CallError, RestError};

/// `getUsers($id, $format='summary')`, `postUsers($request_data)` and a
/// protected `deleteUsers($id)` that counts its invocations.
#[derive(Default)]
pub struct Users {
    pub deletions: Arc<AtomicUsize>,
}

impl ApiClass for Users {
    fn doc(&self) -> &str {
        "/**\n * User accounts\n * @class KeyAuth {key=secret}\n */"
    }

    fn methods(&self) -> Vec<MethodInfo> {
        vec![
            MethodInfo::new("getUsers")
                .doc("/**\n * One user\n * @param int $id {min=1}\n * @param string $format\n */")
                .required("id")
                .optional("format", "summary"),
            MethodInfo::new("postUsers")
                .doc("/**\n * Create a user\n * @status 201 Created\n */")
                .required("request_data"),
            MethodInfo::new("deleteUsers")
                .doc("/**\n * Remove a user\n */")
                .required("id")
                .protected(),
        ]
    }

    fn instantiate(&self, _ctx: &RequestContext) -> Box<dyn ApiHandler> {
        Box::new(UsersHandler {
            deletions: Arc::clone(&self.deletions),
        })
    }
}

struct UsersHandler {
    deletions: Arc<AtomicUsize>,
}

impl ApiHandler for UsersHandler {
    fn call(&mut self, method: &str, args: &[Value]) -> Result<Value, CallError> {
        match method {
            "getUsers" => Ok(json!({ "id": args[0], "format": args[1] })),
            "postUsers" => Ok(args[0].clone()),
            _ => Err(RestError::not_found().into()),
        }
    }

    fn call_protected(&mut self, method: &str, args: &[Value]) -> Result<Value, CallError> {
        match method {
            "deleteUsers" => {
                self.deletions.fetch_add(1, Ordering::SeqCst);
                Ok(json!({ "deleted": args[0] }))
            }
            _ => self.call(method, args),
        }
    }
}

/// Two `@url` routes registered placeholder first.
pub struct Ordered;

impl ApiClass for Ordered {
    fn methods(&self) -> Vec<MethodInfo> {
        vec![
            MethodInfo::new("byId")
                .doc("/**\n * @url GET users/{id}\n */")
                .required("id"),
            MethodInfo::new("active").doc("/**\n * @url GET users/active\n */"),
        ]
    }

    fn instantiate(&self, _ctx: &RequestContext) -> Box<dyn ApiHandler> {
        Box::new(OrderedHandler)
    }
}

struct OrderedHandler;

impl ApiHandler for OrderedHandler {
    fn call(&mut self, method: &str, args: &[Value]) -> Result<Value, CallError> {
        Ok(json!({ "method": method, "args": args }))
    }
}

/// Exercises hooks, status and header directives, custom MIME types and
/// error paths. Every handler call is appended to `log`.
#[derive(Default)]
pub struct Reports {
    pub log: Arc<Mutex<Vec<String>>>,
}

impl ApiClass for Reports {
    fn doc(&self) -> &str {
        "/**\n * Reports\n */"
    }

    fn methods(&self) -> Vec<MethodInfo> {
        vec![
            MethodInfo::new("getSummary")
                .doc("/**\n * Totals\n * @status 202 Accepted\n * @header X-Report: summary\n */"),
            MethodInfo::new("getVersioned")
                .doc("/**\n * @mime application/vnd.acme\n * @version 2\n */"),
            MethodInfo::new("getNothing"),
            MethodInfo::new("getOdd")
                .doc("/**\n * @status abc Weird\n * @status 70000 Big\n */"),
            MethodInfo::new("getConflict"),
            MethodInfo::new("getTeapot"),
            MethodInfo::new("getBroken"),
            MethodInfo::new("_secret"),
        ]
    }

    fn instantiate(&self, _ctx: &RequestContext) -> Box<dyn ApiHandler> {
        Box::new(ReportsHandler {
            log: Arc::clone(&self.log),
        })
    }
}

struct ReportsHandler {
    log: Arc<Mutex<Vec<String>>>,
}

impl ReportsHandler {
    fn record(&self, entry: &str) {
        if let Ok(mut log) = self.log.lock() {
            log.push(entry.to_string());
        }
    }
}

impl ApiHandler for ReportsHandler {
    fn call(&mut self, method: &str, _args: &[Value]) -> Result<Value, CallError> {
        self.record(method);
        match method {
            "_json_getSummary" => Ok(json!("discarded")),
            "getSummary" => Ok(json!({ "total": 3 })),
            "getVersioned" => Ok(json!({ "version": 2 })),
            "getNothing" => Ok(Value::Null),
            "getOdd" => Ok(json!({ "ok": true })),
            "getConflict" => Err(RestError::with_message(409, "already exists").into()),
            "getTeapot" => Err(RestError::with_message(418, "short and stout").into()),
            "getBroken" => Err(anyhow!("database unavailable").into()),
            _ => Err(RestError::not_found().into()),
        }
    }

    fn has_method(&self, method: &str) -> bool {
        matches!(method, "_json_getSummary" | "_getSummary_json")
    }

    fn post_process(&mut self, hook: &str, body: Vec<u8>) -> Vec<u8> {
        self.record(hook);
        [b"/*processed*/".as_slice(), &body].concat()
    }
}

/// Authenticates requests carrying the configured `X-Api-Key`.
pub struct KeyAuth;

impl ApiClass for KeyAuth {
    fn methods(&self) -> Vec<MethodInfo> {
        Vec::new()
    }

    fn instantiate(&self, _ctx: &RequestContext) -> Box<dyn ApiHandler> {
        Box::new(KeyAuthHandler { key: None })
    }
}

struct KeyAuthHandler {
    key: Option<String>,
}

impl ApiHandler for KeyAuthHandler {
    fn call(&mut self, _method: &str, _args: &[Value]) -> Result<Value, CallError> {
        Err(RestError::not_found().into())
    }

    fn configure(&mut self, config: &ClassConfig) {
        self.key = config.get("key").and_then(|v| v.as_str()).map(str::to_string);
    }

    fn as_authenticator(&mut self) -> Option<&mut dyn Authenticator> {
        Some(self)
    }
}

impl Authenticator for KeyAuthHandler {
    fn is_authenticated(&mut self, ctx: &RequestContext) -> bool {
        self.key.is_some() && self.key.as_deref() == ctx.header("x-api-key")
    }
}

/// A class registered as an authenticator without the capability.
pub struct Plain;

impl ApiClass for Plain {
    fn methods(&self) -> Vec<MethodInfo> {
        Vec::new()
    }

    fn instantiate(&self, _ctx: &RequestContext) -> Box<dyn ApiHandler> {
        Box::new(PlainHandler)
    }
}

struct PlainHandler;

impl ApiHandler for PlainHandler {
    fn call(&mut self, _method: &str, _args: &[Value]) -> Result<Value, CallError> {
        Ok(Value::Null)
    }
}

/// An authenticator that answers `allow` and logs every instantiation and
/// question under its name.
pub struct Gate {
    pub name: &'static str,
    pub allow: bool,
    pub log: Arc<Mutex<Vec<String>>>,
}

impl ApiClass for Gate {
    fn methods(&self) -> Vec<MethodInfo> {
        Vec::new()
    }

    fn instantiate(&self, _ctx: &RequestContext) -> Box<dyn ApiHandler> {
        if let Ok(mut log) = self.log.lock() {
            log.push(format!("{}:new", self.name));
        }
        Box::new(GateHandler {
            name: self.name,
            allow: self.allow,
            log: Arc::clone(&self.log),
        })
    }
}

struct GateHandler {
    name: &'static str,
    allow: bool,
    log: Arc<Mutex<Vec<String>>>,
}

impl ApiHandler for GateHandler {
    fn call(&mut self, _method: &str, _args: &[Value]) -> Result<Value, CallError> {
        Err(RestError::not_found().into())
    }

    fn as_authenticator(&mut self) -> Option<&mut dyn Authenticator> {
        Some(self)
    }
}

impl Authenticator for GateHandler {
    fn is_authenticated(&mut self, _ctx: &RequestContext) -> bool {
        if let Ok(mut log) = self.log.lock() {
            log.push(format!("{}:ask", self.name));
        }
        self.allow
    }
}

/// Logs its name for every 404 it handles, leaving the body alone.
pub struct Recorder {
    pub name: &'static str,
    pub log: Arc<Mutex<Vec<String>>>,
}

impl ErrorHandler for Recorder {
    fn handles(&self, code: u16) -> bool {
        code == 404
    }

    fn handle(&self, _code: u16, _ctx: &RequestContext, _response: &mut ApiResponse) {
        if let Ok(mut log) = self.log.lock() {
            log.push(self.name.to_string());
        }
    }
}

/// Replaces the body of 404 responses with plain text.
pub struct NotFoundPage;

impl ErrorHandler for NotFoundPage {
    fn handles(&self, code: u16) -> bool {
        code == 404
    }

    fn handle(&self, _code: u16, ctx: &RequestContext, response: &mut ApiResponse) {
        response.set_header("Content-Type", "text/plain");
        response.set_body(format!("nothing at /{}", ctx.path()));
    }
}

/// Builder with `Users` mounted at the root and `Reports` under `reports/`.
pub fn builder(config: ApiConfig, users: Users, reports: Reports) -> DispatcherBuilder {
    Dispatcher::builder(config)
        .register_class("Users", Arc::new(users))
        .register_class("Reports", Arc::new(reports))
        .api_class("Users", Some(""))
        .api_class("Reports", None)
}

/// The standard dispatcher, without authenticators.
pub fn dispatcher() -> Dispatcher {
    builder(ApiConfig::default(), Users::default(), Reports::default())
        .build()
        .unwrap()
}

/// Decode a JSON response body.
pub fn json_body(response: &ApiResponse) -> Value {
    serde_json::from_slice(&response.body).unwrap()
}

/// A fresh, not yet existing directory under the system temp dir.
pub fn temp_dir() -> PathBuf {
    std::env::temp_dir().join(format!("docrest-it-{}", uuid::Uuid::new_v4()))
}
