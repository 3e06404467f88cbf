//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the `tracing` subscriber from configuration
//! - Log one receipt line and one completion line per request
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the configured level
//! - JSON lines when `json_logs` is set, human-readable otherwise
//! - Both request lines are emitted inside the `request` span, so they carry
//!   the correlation id

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;
use crate::http::request::RequestContext;
use crate::observability::metrics;

/// Install the global subscriber. Later calls are ignored.
pub fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("menagerie={level},tower_http={level}", level = config.log_level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    let result = if config.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    if let Err(e) = result {
        eprintln!("tracing subscriber already installed: {e}");
    }
}

/// Second layer of the chain: request receipt and completion lines.
pub async fn log_exchange(req: Request<Body>, next: Next) -> Response {
    let ctx = req.extensions().get::<RequestContext>().cloned();
    let method = req.method().clone();
    let uri = req.uri().clone();

    tracing::info!(method = %method, uri = %uri, "Received request");

    let response = next.run(req).await;
    let status = response.status();

    match &ctx {
        Some(ctx) => {
            let latency_ms = ctx.received_at().elapsed().as_millis() as u64;
            tracing::info!(status = status.as_u16(), latency_ms, "Request completed");
            metrics::record_request(method.as_str(), ctx.resource(), status.as_u16(), ctx.received_at());
        }
        None => tracing::warn!(status = status.as_u16(), "Request completed without context"),
    }
    response
}
