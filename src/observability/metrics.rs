//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_reloads_total` (counter): reload attempts by outcome
//! - `gateway_mounted_services` (gauge): services in the published table
//! - `gateway_requests_total` (counter): dispatched requests by service, status
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Prometheus exposition on its own listener

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::reload::ReloadPhase;

/// Install the Prometheus exporter. Must be called from within the runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_reload(outcome: ReloadPhase) {
    metrics::counter!("gateway_reloads_total", "outcome" => outcome.to_string()).increment(1);
}

pub fn record_mounted(count: usize) {
    metrics::gauge!("gateway_mounted_services").set(count as f64);
}

pub fn record_request(service: &str, status: u16) {
    metrics::counter!(
        "gateway_requests_total",
        "service" => service.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}
