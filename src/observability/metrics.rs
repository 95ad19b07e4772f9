//! Metrics collection and exposition.
//!
//! # Metrics
//! - `srest_requests_total` (counter): requests by method, status and route
//!   pattern
//! - `srest_request_duration_seconds` (histogram): handler latency
//!
//! Recording without an installed exporter is a no-op, so the route table can
//! record unconditionally.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram, Label};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one handled request.
pub fn record_request(method: &str, status: u16, route: &str, start: Instant) {
    let labels = vec![
        Label::new("method", method.to_string()),
        Label::new("status", status.to_string()),
        Label::new("route", route.to_string()),
    ];
    counter!("srest_requests_total", labels.clone()).increment(1);
    histogram!("srest_request_duration_seconds", labels).record(start.elapsed().as_secs_f64());
}
