//! Prometheus metrics installation
//!
//! The pipeline crates record through the `metrics` facade; this module
//! installs the Prometheus recorder and returns the handle the `/metrics`
//! endpoint renders from.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder. Call once at startup, before any
/// request is served.
pub fn init_metrics() -> Result<PrometheusHandle, crate::ServerError> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| crate::ServerError::Internal(format!("metrics recorder: {}", e)))
}

/// Record the outcome of one HTTP request
pub fn record_http_request(path: &'static str, status: u16) {
    metrics::counter!(
        "http_requests_total",
        "path" => path,
        "status" => status.to_string()
    )
    .increment(1);
}
