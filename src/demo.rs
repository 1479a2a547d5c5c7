//! Demo API served by the binary.

use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use serde_json::{json, Value};

use docrest::api::{ApiClass, ApiHandler, Authenticator, MethodInfo};
use docrest::dispatch::RequestContext;
use docrest::metadata::ClassConfig;
use docrest::{CallError, RestError};

fn text(args: &[Value], index: usize) -> String {
    match args.get(index) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Greetings.
pub struct Say;

impl ApiClass for Say {
    fn doc(&self) -> &str {
        "/**\n * Greetings\n */"
    }

    fn methods(&self) -> Vec<MethodInfo> {
        vec![
            MethodInfo::new("hello")
                .doc("/**\n * Greet someone, the world by default\n * @param string $to name\n */")
                .optional("to", "world"),
            MethodInfo::new("hi")
                .doc("/**\n * Greet someone by name\n * @param string $to name\n */")
                .required("to"),
        ]
    }

    fn instantiate(&self, _ctx: &RequestContext) -> Box<dyn ApiHandler> {
        Box::new(SayHandler)
    }
}

struct SayHandler;

impl ApiHandler for SayHandler {
    fn call(&mut self, method: &str, args: &[Value]) -> Result<Value, CallError> {
        match method {
            "hello" => Ok(json!(format!("Hello {}!", text(args, 0)))),
            "hi" => Ok(json!(format!("Hi {}!", text(args, 0)))),
            _ => Err(RestError::not_found().into()),
        }
    }
}

/// In-memory notes. Deleting requires the `X-Api-Key` header.
#[derive(Default)]
pub struct Notes {
    store: Arc<Mutex<Vec<String>>>,
}

impl ApiClass for Notes {
    fn doc(&self) -> &str {
        "/**\n * Notes\n * @class KeyAuth {key=changeme}\n */"
    }

    fn methods(&self) -> Vec<MethodInfo> {
        vec![
            MethodInfo::new("index").doc("/**\n * List notes\n */"),
            MethodInfo::new("get")
                .doc("/**\n * One note\n * @param int $id {min=0}\n * @throws RestError 404 Not Found\n */")
                .required("id"),
            MethodInfo::new("post")
                .doc("/**\n * Add a note\n * @status 201 Created\n */")
                .required("request_data"),
            MethodInfo::new("delete")
                .doc("/**\n * Remove a note\n */")
                .required("id")
                .protected(),
        ]
    }

    fn instantiate(&self, _ctx: &RequestContext) -> Box<dyn ApiHandler> {
        Box::new(NotesHandler {
            store: Arc::clone(&self.store),
        })
    }
}

struct NotesHandler {
    store: Arc<Mutex<Vec<String>>>,
}

impl NotesHandler {
    fn position(args: &[Value]) -> Result<usize, RestError> {
        text(args, 0)
            .parse()
            .map_err(|_| RestError::bad_request("id must be a non-negative integer"))
    }
}

impl ApiHandler for NotesHandler {
    fn call(&mut self, method: &str, args: &[Value]) -> Result<Value, CallError> {
        let mut notes = self
            .store
            .lock()
            .map_err(|_| anyhow!("notes store poisoned"))?;
        match method {
            "index" => Ok(json!(*notes)),
            "get" => {
                let id = Self::position(args)?;
                notes
                    .get(id)
                    .map(|note| json!({ "id": id, "text": note }))
                    .ok_or_else(|| RestError::not_found().into())
            }
            "post" => {
                let note = args
                    .first()
                    .and_then(|data| data.get("text"))
                    .and_then(Value::as_str)
                    .ok_or_else(|| RestError::bad_request("text is required"))?;
                notes.push(note.to_string());
                Ok(json!({ "id": notes.len() - 1, "text": note }))
            }
            "delete" => {
                let id = Self::position(args)?;
                if id >= notes.len() {
                    return Err(RestError::not_found().into());
                }
                Ok(json!({ "id": id, "text": notes.remove(id) }))
            }
            _ => Err(RestError::not_found().into()),
        }
    }
}

/// Accepts requests whose `X-Api-Key` header matches the configured key.
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
        match (&self.key, ctx.header("x-api-key")) {
            (Some(key), Some(given)) => key == given,
            _ => false,
        }
    }
}
