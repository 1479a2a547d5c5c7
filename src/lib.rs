//! Annotation-driven REST routing and dispatch.
//!
//! API classes describe their methods and doc comments through
//! [`api::ApiClass`]; the [`dispatch::DispatcherBuilder`] compiles them into
//! a route table once, and the [`dispatch::Dispatcher`] serves requests by
//! negotiating formats, matching routes, authenticating and invoking the
//! handler.

pub mod api;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod format;
pub mod http;
pub mod lifecycle;
pub mod metadata;
pub mod observability;
pub mod routing;
pub mod verb;

pub use config::schema::ServerConfig;
pub use dispatch::{ApiRequest, ApiResponse, Dispatcher, DispatcherBuilder};
pub use error::{CallError, ConfigError, DispatchError, RestError};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
