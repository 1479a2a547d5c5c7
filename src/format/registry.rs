//! Format registry and content negotiation.
//!
//! # Responsibilities
//! - Map extensions and MIME types to registered formats
//! - Pick the response format from path extension, `Accept`, or the default
//! - Pick the request format from `Content-Type`
//!
//! # Design Decisions
//! - First registered format is the default
//! - For an extension or MIME type claimed twice, the first format wins
//! - Immutable once the dispatcher is built; resolution is a pure lookup

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{ConfigError, RestError};
use crate::format::{urlencoded, Format, FormatBinding, Selection, UrlEncodedFormat};

#[derive(Debug, Clone)]
pub struct FormatRegistry {
    formats: Vec<Arc<dyn Format>>,
    by_extension: HashMap<String, usize>,
    by_mime: HashMap<String, usize>,
    /// Extensions in registration order, for path stripping.
    extensions: Vec<String>,
    urlencoded: Arc<dyn Format>,
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatRegistry {
    pub fn new() -> Self {
        Self {
            formats: Vec::new(),
            by_extension: HashMap::new(),
            by_mime: HashMap::new(),
            extensions: Vec::new(),
            urlencoded: Arc::new(UrlEncodedFormat),
        }
    }

    /// Register formats. The first format ever registered is the default.
    pub fn register_formats(&mut self, formats: Vec<Arc<dyn Format>>) -> Result<(), ConfigError> {
        if formats.is_empty() {
            return Err(ConfigError::InvalidFormat(
                "at least one format is required".to_string(),
            ));
        }
        for format in formats {
            if format.mime_map().is_empty() {
                return Err(ConfigError::InvalidFormat(format!(
                    "{:?} declares no extension/MIME pairs",
                    format
                )));
            }
            let index = self.formats.len();
            for (extension, mime) in format.mime_map() {
                if !self.by_extension.contains_key(*extension) {
                    self.by_extension.insert(extension.to_string(), index);
                    self.extensions.push(extension.to_string());
                }
                self.by_mime.entry(mime.to_string()).or_insert(index);
            }
            tracing::debug!(format = ?format, "Registered format");
            self.formats.push(format);
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn default_format(&self) -> Option<&Arc<dyn Format>> {
        self.formats.first()
    }

    pub fn by_extension(&self, extension: &str) -> Option<&Arc<dyn Format>> {
        self.by_extension.get(extension).map(|&i| &self.formats[i])
    }

    pub fn by_mime(&self, mime: &str) -> Option<&Arc<dyn Format>> {
        self.by_mime.get(mime).map(|&i| &self.formats[i])
    }

    /// Choose the response format.
    ///
    /// `path` is the request path without the query string. Its dot-separated
    /// pieces are scanned from the end; the text of a piece up to the next
    /// `/` is tried as an extension. Then each `Accept` entry is tried as a
    /// MIME type. Otherwise the default format is used.
    ///
    /// # Panics
    /// If no format is registered. `DispatcherBuilder::build` registers
    /// JSON when nothing else was.
    pub fn resolve_response(&self, path: &str, accept: Option<&str>) -> FormatBinding {
        for piece in path.split('.').skip(1).collect::<Vec<_>>().into_iter().rev() {
            let extension = piece.split('/').next().unwrap_or_default();
            if extension.is_empty() {
                continue;
            }
            if let Some(format) = self.by_extension(extension) {
                return FormatBinding::new(
                    Arc::clone(format),
                    Selection::Extension(extension.to_string()),
                );
            }
        }

        if let Some(accept) = accept {
            for entry in accept.split(',') {
                let mime = media_type(entry);
                if let Some(format) = self.by_mime(mime) {
                    return FormatBinding::new(Arc::clone(format), Selection::Mime(mime.to_string()));
                }
            }
        }

        FormatBinding::new(Arc::clone(&self.formats[0]), Selection::Default)
    }

    /// Choose the request format from `Content-Type`.
    ///
    /// Without a content type the response binding is reused.
    pub fn resolve_request(
        &self,
        content_type: Option<&str>,
        response: &FormatBinding,
    ) -> Result<FormatBinding, RestError> {
        let Some(content_type) = content_type else {
            return Ok(response.clone());
        };
        let mime = media_type(content_type);
        if mime == urlencoded::MIME {
            return Ok(FormatBinding::new(
                Arc::clone(&self.urlencoded),
                Selection::Mime(mime.to_string()),
            ));
        }
        match self.by_mime(mime) {
            Some(format) => Ok(FormatBinding::new(
                Arc::clone(format),
                Selection::Mime(mime.to_string()),
            )),
            None => Err(RestError::unsupported_media_type(format!(
                "Content type {} is not supported.",
                mime
            ))),
        }
    }
}

/// The media type of a header entry, without parameters.
fn media_type(entry: &str) -> &str {
    entry.split(';').next().unwrap_or_default().trim()
}
