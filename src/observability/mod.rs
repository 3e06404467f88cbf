//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! http::request::correlate (opens `request` span with request_id)
//!     → logging.rs (receipt/completion lines inside the span)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (text or JSON lines)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Correlation id flows through the span, not through function arguments
//! - Metrics are cheap and no-ops until the exporter is installed

pub mod logging;
pub mod metrics;
