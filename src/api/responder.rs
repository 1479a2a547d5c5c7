//! Default response shaping.

use serde_json::{json, Value};

use crate::api::Responder;
use crate::dispatch::RequestContext;

/// Passes results through unchanged and wraps errors as
/// `{"error": {"code": .., "message": ..}}`.
///
/// A method documented with `@mime application/vnd.acme` (and optionally
/// `@version 2`) is served as `application/vnd.acme-v2+json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultResponder;

impl Responder for DefaultResponder {
    fn format_success(&self, result: Value, _ctx: &RequestContext) -> Value {
        result
    }

    fn format_error(&self, code: u16, message: &str, _ctx: &RequestContext) -> Value {
        json!({
            "error": {
                "code": code,
                "message": message,
            }
        })
    }

    fn content_type(&self, ctx: &RequestContext) -> Option<String> {
        let metadata = &ctx.call()?.metadata;
        let mime = metadata.tag("mime").filter(|m| !m.is_empty())?;
        let extension = ctx.response_format()?.extension();
        Some(match metadata.tag("version").filter(|v| !v.is_empty()) {
            Some(version) => format!("{}-v{}+{}", mime, version, extension),
            None => format!("{}+{}", mime, extension),
        })
    }
}
