//! Built-in `application/x-www-form-urlencoded` codec, used for request
//! bodies whatever formats are registered.

use serde_json::{Map, Value};
use url::form_urlencoded;

use crate::error::RestError;
use crate::format::Format;

pub const MIME: &str = "application/x-www-form-urlencoded";
pub const EXTENSION: &str = "post";

#[derive(Debug, Clone, Copy, Default)]
pub struct UrlEncodedFormat;

/// Decode a query string into an object of strings. Later keys win.
pub fn decode_pairs(input: &[u8]) -> Map<String, Value> {
    form_urlencoded::parse(input)
        .map(|(key, value)| (key.into_owned(), Value::String(value.into_owned())))
        .collect()
}

impl Format for UrlEncodedFormat {
    fn mime_map(&self) -> &[(&'static str, &'static str)] {
        &[(EXTENSION, MIME)]
    }

    fn encode(&self, data: &Value, _human_readable: bool) -> Vec<u8> {
        let Value::Object(map) = data else {
            return Vec::new();
        };
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in map {
            match value {
                Value::String(text) => serializer.append_pair(key, text),
                Value::Null => serializer.append_pair(key, ""),
                other => serializer.append_pair(key, &other.to_string()),
            };
        }
        serializer.finish().into_bytes()
    }

    fn decode(&self, body: &[u8]) -> Result<Value, RestError> {
        Ok(Value::Object(decode_pairs(body)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode() {
        let decoded = UrlEncodedFormat.decode(b"name=Jane+Doe&age=41&age=42").unwrap();
        assert_eq!(decoded, json!({"name": "Jane Doe", "age": "42"}));
    }

    #[test]
    fn test_encode_object() {
        let encoded = UrlEncodedFormat.encode(&json!({"a": "x y", "b": 2, "c": null}), false);
        assert_eq!(encoded, b"a=x+y&b=2&c=".to_vec());
        assert!(UrlEncodedFormat.encode(&json!([1, 2]), false).is_empty());
    }
}
