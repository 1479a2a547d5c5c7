//! docrest server.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌───────────────────────────────────────────────────┐
//!                         │                      DOCREST                      │
//!                         │                                                   │
//!  Client Request         │  ┌─────────┐    ┌────────────┐    ┌────────────┐  │
//!  ───────────────────────┼─▶│  http   │───▶│  dispatch  │───▶│  routing   │  │
//!                         │  │ server  │    │  context   │    │   table    │  │
//!                         │  └─────────┘    └─────┬──────┘    └────────────┘  │
//!                         │                       │                           │
//!                         │                       ▼                           │
//!  Client Response        │  ┌─────────┐    ┌────────────┐    ┌────────────┐  │
//!  ◀──────────────────────┼──│ format  │◀───│ responder  │◀───│ API class  │  │
//!                         │  │ encode  │    │            │    │  handler   │  │
//!                         │  └─────────┘    └────────────┘    └────────────┘  │
//!                         │                                                   │
//!                         │  Startup: config → metadata → compiler → cache    │
//!                         └───────────────────────────────────────────────────┘
//! ```

mod demo;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use docrest::config::loader::load_config;
use docrest::config::ServerConfig;
use docrest::dispatch::Dispatcher;
use docrest::lifecycle::startup;
use docrest::observability::logging;

#[derive(Parser)]
#[command(name = "docrest")]
#[command(about = "Annotation-driven REST API server", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Force production mode (trust and write the route cache)
    #[arg(long)]
    production: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if cli.production {
        config.api.production_mode = true;
    }

    logging::init(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "docrest starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        production_mode = config.api.production_mode,
        api_version = config.api.api_version,
        "Configuration loaded"
    );

    let dispatcher = Dispatcher::builder(config.api.clone())
        .register_class("Say", Arc::new(demo::Say))
        .register_class("Notes", Arc::new(demo::Notes::default()))
        .register_class("KeyAuth", Arc::new(demo::KeyAuth))
        .api_class("Say", None)
        .api_class("Notes", None)
        .authentication_class("KeyAuth", None)
        .build()?;

    startup::serve(config, dispatcher).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
