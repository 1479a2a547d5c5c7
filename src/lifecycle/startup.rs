//! Startup orchestration.
//!
//! # Responsibilities
//! - Start the metrics exporter when enabled
//! - Bind the listener and serve the dispatcher until shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::dispatch::Dispatcher;
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;

/// Serve `dispatcher` with `config` until a stop signal arrives.
pub async fn serve(config: ServerConfig, dispatcher: Dispatcher) -> anyhow::Result<()> {
    if config.observability.metrics_enabled {
        let addr = config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .with_context(|| format!("invalid metrics address {}", config.observability.metrics_address))?;
        metrics::init_metrics(addr);
    }

    let listener = TcpListener::bind(&config.listener.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", config.listener.bind_address))?;
    tracing::info!(
        address = %listener.local_addr()?,
        routes = dispatcher.routes().len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Listening for connections"
    );

    let shutdown = Shutdown::new();
    let signal_listener = signals::spawn_signal_listener(shutdown.clone());

    let server = HttpServer::new(config, Arc::new(dispatcher));
    server.run(listener, shutdown.subscribe()).await?;

    signal_listener.abort();
    Ok(())
}
