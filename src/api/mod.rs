//! API class extension points.
//!
//! # Responsibilities
//! - Describe routable methods without runtime reflection ([`ApiClass::methods`])
//! - Construct a handler per request ([`ApiClass::instantiate`])
//! - Invoke handler methods positionally ([`ApiHandler::call`])
//! - Define the collaborator capabilities the dispatcher consumes:
//!   [`Authenticator`], [`Responder`], [`ErrorHandler`]
//!
//! # Design Decisions
//! - Classes are registered once, under a stable identifier, in a
//!   [`ClassRegistry`]; the dispatcher never builds anything by name
//! - A handler lives for exactly one request
//! - `@class` configuration reaches a collaborator through
//!   [`ApiHandler::configure`] before it is used

pub mod registry;
pub mod responder;

use serde_json::Value;

use crate::dispatch::{ApiResponse, RequestContext};
use crate::error::CallError;
use crate::metadata::ClassConfig;

pub use registry::ClassRegistry;
pub use responder::DefaultResponder;

/// Declared visibility of a handler method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    /// Routable, but only after authentication.
    Protected,
    /// Never routed.
    Private,
}

/// One declared method parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamInfo {
    pub name: String,
    /// Default value; `None` means the parameter is required.
    pub default: Option<Value>,
}

impl ParamInfo {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }

    pub fn optional(name: impl Into<String>, default: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            default: Some(default.into()),
        }
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// Signature and doc comment of one handler method.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodInfo {
    pub name: String,
    pub doc: String,
    pub params: Vec<ParamInfo>,
    pub visibility: Visibility,
}

impl MethodInfo {
    /// A public method with no parameters and no documentation.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            doc: String::new(),
            params: Vec::new(),
            visibility: Visibility::Public,
        }
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }

    pub fn required(mut self, name: impl Into<String>) -> Self {
        self.params.push(ParamInfo::required(name));
        self
    }

    pub fn optional(mut self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.params.push(ParamInfo::optional(name, default));
        self
    }

    pub fn protected(mut self) -> Self {
        self.visibility = Visibility::Protected;
        self
    }

    pub fn private(mut self) -> Self {
        self.visibility = Visibility::Private;
        self
    }
}

/// A registrable API class: its introspection data plus a handler factory.
pub trait ApiClass: Send + Sync {
    /// Class-level doc comment.
    fn doc(&self) -> &str {
        ""
    }

    /// Public and protected methods, in declaration order.
    fn methods(&self) -> Vec<MethodInfo>;

    /// Create the handler serving one request. `ctx` is the read-only view
    /// of the request being dispatched.
    fn instantiate(&self, ctx: &RequestContext) -> Box<dyn ApiHandler>;
}

/// A per-request instance of an [`ApiClass`].
pub trait ApiHandler: Send {
    /// Call a public method with positional arguments.
    fn call(&mut self, method: &str, args: &[Value]) -> Result<Value, CallError>;

    /// Call a protected method with positional arguments.
    fn call_protected(&mut self, method: &str, args: &[Value]) -> Result<Value, CallError> {
        self.call(method, args)
    }

    /// Whether the handler implements `method`. Used for the optional
    /// pre/post processing hooks, which are not part of [`ApiClass::methods`].
    fn has_method(&self, _method: &str) -> bool {
        false
    }

    /// Run the post-processing hook `hook` on the encoded response body.
    fn post_process(&mut self, _hook: &str, body: Vec<u8>) -> Vec<u8> {
        body
    }

    /// Apply `@class` configuration addressed to this class.
    fn configure(&mut self, _config: &ClassConfig) {}

    /// The authentication capability, when the class provides one.
    fn as_authenticator(&mut self) -> Option<&mut dyn Authenticator> {
        None
    }
}

/// Decides whether a request may reach a protected method.
pub trait Authenticator {
    fn is_authenticated(&mut self, ctx: &RequestContext) -> bool;
}

/// Shapes handler results and error envelopes before encoding.
pub trait Responder: Send + Sync {
    fn format_success(&self, result: Value, ctx: &RequestContext) -> Value;

    fn format_error(&self, code: u16, message: &str, ctx: &RequestContext) -> Value;

    /// Content type overriding the response format's MIME type.
    fn content_type(&self, _ctx: &RequestContext) -> Option<String> {
        None
    }
}

/// Custom handling for specific error status codes.
///
/// When at least one registered handler accepts a code, the default error
/// body is not produced.
pub trait ErrorHandler: Send + Sync {
    fn handles(&self, code: u16) -> bool;

    fn handle(&self, code: u16, ctx: &RequestContext, response: &mut ApiResponse);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_method_info_builder() {
        let method = MethodInfo::new("getUsers")
            .doc("/** List */")
            .required("id")
            .optional("format", "summary")
            .protected();

        assert_eq!(method.params.len(), 2);
        assert!(method.params[0].is_required());
        assert_eq!(method.params[1].default, Some(json!("summary")));
        assert_eq!(method.visibility, Visibility::Protected);
    }
}
