//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup):
//!     ApiClass::methods() + doc comments
//!     → compiler.rs (conventional URLs, @url directives, access flags)
//!     → table.rs (verb → ordered pattern → CallDescriptor)
//!     ↔ cache.rs (routes.json snapshot, production mode only)
//!
//! Request Lookup:
//!     verb + normalized path
//!     → table.rs (scan the verb's routes in registration order)
//!     → matcher.rs (literal compare or anchored placeholder regex)
//!     → Return: CallDescriptor + captures, or no match
//! ```
//!
//! # Design Decisions
//! - Routes compiled once, immutable at runtime
//! - Patterns compiled when inserted, never per request
//! - First match wins (ordered by registration)

pub mod cache;
pub mod compiler;
pub mod matcher;
pub mod table;

pub use cache::RouteCache;
pub use compiler::{RouteCompiler, REQUEST_DATA};
pub use matcher::RoutePattern;
pub use table::{Access, CallDescriptor, ParameterDescriptor, RouteMatch, RouteTable};
