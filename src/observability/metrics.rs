//! Metrics collection and exposition.
//!
//! # Metrics
//! - `menagerie_requests_total` (counter): requests by method, resource, status
//! - `menagerie_request_duration_seconds` (histogram): latency distribution
//! - `menagerie_timeouts_total` (counter): dispatcher timeouts by resource
//! - `menagerie_orphaned_results_total` (counter): handler results that
//!   arrived after their deadline
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::resources::ResourceKind;

fn resource_label(resource: Option<ResourceKind>) -> &'static str {
    resource.map(ResourceKind::segment).unwrap_or("none")
}

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one completed request.
pub fn record_request(method: &str, resource: Option<ResourceKind>, status: u16, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("resource", resource_label(resource).to_string()),
        ("status", status.to_string()),
    ];
    metrics::counter!("menagerie_requests_total", &labels).increment(1);
    metrics::histogram!("menagerie_request_duration_seconds", &labels).record(start.elapsed().as_secs_f64());
}

pub fn record_timeout(resource: Option<ResourceKind>) {
    metrics::counter!("menagerie_timeouts_total", "resource" => resource_label(resource)).increment(1);
}

pub fn record_orphaned(resource: Option<ResourceKind>) {
    metrics::counter!("menagerie_orphaned_results_total", "resource" => resource_label(resource)).increment(1);
}

pub fn record_unauthorized() {
    metrics::counter!("menagerie_unauthorized_total").increment(1);
}
