//! Request conversion.
//!
//! # Responsibilities
//! - Buffer the body up to the configured limit
//! - Hand method, path and query, and headers to the dispatcher unchanged
//!
//! # Design Decisions
//! - The body is read completely before dispatch; formats decode from bytes
//! - An oversized body never reaches the dispatcher

use axum::body::Body;
use axum::http::{Request, StatusCode};

use crate::dispatch::ApiRequest;

/// Convert an axum request, reading at most `max_body_size` body bytes.
pub async fn into_api_request(
    request: Request<Body>,
    max_body_size: usize,
) -> Result<ApiRequest, StatusCode> {
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, max_body_size)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, limit = max_body_size, "Request body rejected");
            StatusCode::PAYLOAD_TOO_LARGE
        })?;
    let uri = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| parts.uri.path().to_string());

    Ok(ApiRequest {
        method: parts.method,
        uri,
        headers: parts.headers,
        body,
    })
}
