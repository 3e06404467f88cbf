//! Menagerie record service (v1)
//!
//! A CRUD HTTP service for person and animal records built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────────────┐
//!                    │                        MENAGERIE                          │
//!                    │                                                           │
//!  Client Request    │  ┌─────────────┐   ┌─────────┐   ┌──────────────┐         │
//!  ──────────────────┼─▶│ correlation │──▶│ logging │──▶│ authorization│         │
//!                    │  │  (span, id) │   │         │   │ (shared key) │         │
//!                    │  └─────────────┘   └─────────┘   └──────┬───────┘         │
//!                    │                                         │                 │
//!                    │                                         ▼                 │
//!                    │                                 ┌──────────────┐          │
//!                    │                                 │  dispatcher  │          │
//!                    │                                 │ (deadline)   │          │
//!                    │                                 └──────┬───────┘          │
//!                    │                                        ▼                  │
//!  Client Response   │                                 ┌──────────────┐          │
//!  ◀─────────────────┼─────────────────────────────────│   handler    │          │
//!                    │                                 │ + record     │──▶ memory│
//!                    │                                 │   store      │  / sqlite│
//!                    │                                 └──────────────┘          │
//!                    └──────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use menagerie::config::{self, ServiceConfig};
use menagerie::lifecycle::{signals, startup, Shutdown};
use menagerie::observability::{logging, metrics};
use menagerie::HttpServer;

#[derive(Parser)]
#[command(name = "menagerie")]
#[command(about = "CRUD record service for people and animals", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config: ServiceConfig = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => config::loader::default_config()?,
    };

    logging::init_tracing(&config.observability);
    tracing::info!("menagerie v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_ms = config.timeouts.request_ms,
        overrides = config.timeouts.overrides.len(),
        auth_header = %config.auth.header,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let store = startup::open_store(&config.storage).await?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    signals::forward_signals(shutdown.clone());

    let server = HttpServer::new(config, store);
    server.run(listener, shutdown.signalled()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
