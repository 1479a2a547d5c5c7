//! JSON format.

use serde_json::error::Category;
use serde_json::{Map, Value};

use crate::error::RestError;
use crate::format::Format;

pub const MIME: &str = "application/json";
pub const EXTENSION: &str = "json";

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

impl Format for JsonFormat {
    fn mime_map(&self) -> &[(&'static str, &'static str)] {
        &[(EXTENSION, MIME)]
    }

    fn encode(&self, data: &Value, human_readable: bool) -> Vec<u8> {
        let encoded = if human_readable {
            serde_json::to_vec_pretty(data)
        } else {
            serde_json::to_vec(data)
        };
        encoded.unwrap_or_default()
    }

    fn decode(&self, body: &[u8]) -> Result<Value, RestError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Object(Map::new()));
        }
        serde_json::from_slice(body).map_err(|e| {
            let reason = match e.classify() {
                Category::Syntax => "malformed JSON",
                Category::Eof => "unexpected end of input",
                Category::Data => "unexpected data",
                Category::Io => "unknown error",
            };
            RestError::bad_request(format!(
                "Error parsing JSON, {} at line {} column {}",
                reason,
                e.line(),
                e.column()
            ))
        })
    }
}
