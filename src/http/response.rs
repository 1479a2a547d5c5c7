//! Response conversion.
//!
//! # Design Decisions
//! - Status codes axum cannot represent become 500
//! - Headers with invalid names or values are dropped with a warning

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::dispatch::ApiResponse;

/// Convert a dispatcher response into an axum response.
pub fn into_response(api: ApiResponse) -> Response {
    let status = StatusCode::from_u16(api.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = (status, Body::from(api.body)).into_response();
    let headers = response.headers_mut();
    for (name, value) in api.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => tracing::warn!(header = %name, "Dropping invalid response header"),
        }
    }
    response
}
