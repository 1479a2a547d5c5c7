//! Error types.
//!
//! # Taxonomy
//! - [`RestError`]: client and domain errors. Always turned into a response.
//! - [`ConfigError`]: setup failures (formats, classes, cache, config file).
//! - [`CallError`]: what a handler returns; either a [`RestError`] or an
//!   opaque failure that is not masked as an API error.
//! - [`DispatchError`]: the only way a request escapes the dispatcher
//!   without a response.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::validation::ValidationError;

/// An error carrying an HTTP status code and an optional detail message.
///
/// Raised intentionally by handlers, authenticators and formats, and by the
/// dispatcher itself for unsupported media types, malformed bodies, missing
/// routes and failed authentication.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct RestError {
    /// HTTP status code.
    pub code: u16,
    /// Detail appended to the reason phrase in the error envelope.
    pub message: Option<String>,
}

impl RestError {
    /// Create an error with a status code and no detail.
    pub fn new(code: u16) -> Self {
        Self { code, message: None }
    }

    /// Create an error with a status code and a detail message.
    pub fn with_message(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: Some(message.into()),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_message(400, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(401)
    }

    pub fn not_found() -> Self {
        Self::new(404)
    }

    pub fn unsupported_media_type(message: impl Into<String>) -> Self {
        Self::with_message(415, message)
    }
}

impl fmt::Display for RestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{} {}", self.code, message),
            None => write!(f, "{}", self.code),
        }
    }
}

/// Failure returned by handler code.
#[derive(Debug, Error)]
pub enum CallError {
    /// Intentional API error; becomes an error response.
    #[error(transparent)]
    Rest(#[from] RestError),

    /// Anything else. Propagates out of the dispatcher untouched.
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

/// Error escaping [`Dispatcher::dispatch`](crate::dispatch::Dispatcher::dispatch).
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("unexpected failure in {class}::{method}")]
    Unexpected {
        class: String,
        method: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Fatal setup error. Aborts building the dispatcher or loading config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("invalid format registration: {0}")]
    InvalidFormat(String),

    #[error("API class {0} is missing")]
    MissingClass(String),

    #[error("route pattern '{pattern}' cannot be compiled: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error(
        "the cache directory located at '{}' needs to be writable in order to save the route cache: {source}",
        dir.display()
    )]
    CacheWrite {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("route cache cannot be serialized: {0}")]
    CacheEncode(#[from] serde_json::Error),

    #[error("route cache cannot be parsed: {0}")]
    CacheDecode(#[source] serde_json::Error),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rest_error_display() {
        assert_eq!(RestError::not_found().to_string(), "404");
        assert_eq!(
            RestError::bad_request("Error parsing JSON").to_string(),
            "400 Error parsing JSON"
        );
    }

    #[test]
    fn test_call_error_from_rest_error() {
        let err: CallError = RestError::new(409).into();
        assert!(matches!(err, CallError::Rest(RestError { code: 409, .. })));
    }
}
