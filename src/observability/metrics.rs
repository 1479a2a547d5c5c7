//! Metrics collection and exposition.
//!
//! # Metrics
//! - `docrest_requests_total` (counter): requests by verb, status, route
//! - `docrest_request_duration_seconds` (histogram): dispatch latency
//! - `docrest_route_cache_total` (counter): route cache hits and misses
//!
//! # Design Decisions
//! - Unmatched requests are labelled with route `none` and unknown methods
//!   with verb `other`, to bound cardinality
//! - The Prometheus listener is optional and installed by the binary

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::verb::Verb;

/// Label for requests whose method the router does not know.
pub const UNKNOWN_VERB: &str = "other";

/// Verb label value; never taken from client-supplied text.
pub fn verb_label(verb: Option<Verb>) -> &'static str {
    verb.map_or(UNKNOWN_VERB, |verb| verb.as_str())
}

/// Install the Prometheus exporter with an HTTP listener on `addr`.
///
/// Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one dispatched request.
pub fn record_request(verb: Option<Verb>, status: u16, route: &str, start: Instant) {
    let verb = verb_label(verb);
    metrics::counter!(
        "docrest_requests_total",
        "verb" => verb,
        "status" => status.to_string(),
        "route" => route.to_string()
    )
    .increment(1);
    metrics::histogram!("docrest_request_duration_seconds", "verb" => verb)
        .record(start.elapsed().as_secs_f64());
}

/// Record a route cache outcome (`hit` or `miss`).
pub fn record_route_cache(outcome: &'static str) {
    metrics::counter!("docrest_route_cache_total", "outcome" => outcome).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verb_label_is_bounded() {
        assert_eq!(verb_label(Some(Verb::Delete)), "DELETE");
        assert_eq!(verb_label(None), UNKNOWN_VERB);
    }
}
