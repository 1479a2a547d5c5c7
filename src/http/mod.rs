//! HTTP transport adapter.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum router, tower-http layers: request id, trace, timeout, body limit)
//!     → request.rs (axum Request → ApiRequest)
//!     → Dispatcher::dispatch (blocking pool)
//!     → response.rs (ApiResponse → axum Response)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use server::HttpServer;
