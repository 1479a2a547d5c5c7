//! Data formats and content negotiation.
//!
//! # Data Flow
//! ```text
//! request path + Accept ──► FormatRegistry::resolve_response ──► response FormatBinding
//! Content-Type ───────────► FormatRegistry::resolve_request ───► request FormatBinding
//!                                   (falls back to the response binding)
//! ```
//!
//! # Design Decisions
//! - Formats are stateless and shared (`Arc<dyn Format>`); what a request
//!   selected lives in its [`FormatBinding`]
//! - Structured data is `serde_json::Value` regardless of wire format
//! - Decoding may fail with a client error; encoding is total

pub mod json;
pub mod registry;
pub mod urlencoded;

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::RestError;

pub use json::JsonFormat;
pub use registry::FormatRegistry;
pub use urlencoded::UrlEncodedFormat;

/// A pluggable wire format.
pub trait Format: Send + Sync + fmt::Debug {
    /// Extension to MIME type pairs served by this format, e.g.
    /// `[("json", "application/json")]`. The first pair is the primary one.
    fn mime_map(&self) -> &[(&'static str, &'static str)];

    /// Encode a response value.
    fn encode(&self, data: &Value, human_readable: bool) -> Vec<u8>;

    /// Decode a request body. Malformed input is a client error.
    fn decode(&self, body: &[u8]) -> Result<Value, RestError>;
}

/// What picked the format for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Extension(String),
    Mime(String),
    Default,
}

/// A format chosen for one direction of one request.
#[derive(Clone)]
pub struct FormatBinding {
    format: Arc<dyn Format>,
    selection: Selection,
}

impl FormatBinding {
    pub fn new(format: Arc<dyn Format>, selection: Selection) -> Self {
        Self { format, selection }
    }

    pub fn format(&self) -> &Arc<dyn Format> {
        &self.format
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// The extension in effect: the one selected, the one paired with the
    /// selected MIME type, or the primary one.
    pub fn extension(&self) -> &str {
        let map = self.format.mime_map();
        match &self.selection {
            Selection::Extension(ext) => ext,
            Selection::Mime(mime) => map
                .iter()
                .find(|(_, m)| m == mime)
                .or_else(|| map.first())
                .map(|(ext, _)| *ext)
                .unwrap_or_default(),
            Selection::Default => map.first().map(|(ext, _)| *ext).unwrap_or_default(),
        }
    }

    /// The MIME type in effect, resolved the same way as [`extension`](Self::extension).
    pub fn mime(&self) -> &str {
        let map = self.format.mime_map();
        match &self.selection {
            Selection::Mime(mime) => mime,
            Selection::Extension(ext) => map
                .iter()
                .find(|(e, _)| e == ext)
                .or_else(|| map.first())
                .map(|(_, mime)| *mime)
                .unwrap_or_default(),
            Selection::Default => map.first().map(|(_, mime)| *mime).unwrap_or_default(),
        }
    }

    pub fn encode(&self, data: &Value, human_readable: bool) -> Vec<u8> {
        self.format.encode(data, human_readable)
    }

    pub fn decode(&self, body: &[u8]) -> Result<Value, RestError> {
        self.format.decode(body)
    }
}

impl fmt::Debug for FormatBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatBinding")
            .field("extension", &self.extension())
            .field("mime", &self.mime())
            .field("selection", &self.selection)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Yaml;

    impl Format for Yaml {
        fn mime_map(&self) -> &[(&'static str, &'static str)] {
            &[("yaml", "application/x-yaml"), ("yml", "text/yaml")]
        }

        fn encode(&self, _data: &Value, _human_readable: bool) -> Vec<u8> {
            Vec::new()
        }

        fn decode(&self, _body: &[u8]) -> Result<Value, RestError> {
            Ok(Value::Null)
        }
    }

    #[test]
    fn test_binding_pairs_extension_and_mime() {
        let by_mime = FormatBinding::new(Arc::new(Yaml), Selection::Mime("text/yaml".into()));
        assert_eq!(by_mime.extension(), "yml");
        assert_eq!(by_mime.mime(), "text/yaml");

        let by_ext = FormatBinding::new(Arc::new(Yaml), Selection::Extension("yaml".into()));
        assert_eq!(by_ext.mime(), "application/x-yaml");

        let default = FormatBinding::new(Arc::new(Yaml), Selection::Default);
        assert_eq!(default.extension(), "yaml");
    }
}
