//! Metrics collection and exposition.
//!
//! # Metrics
//! - `imageproxy_requests_total` (counter): image requests by status
//! - `imageproxy_request_duration_seconds` (histogram): dispatcher latency
//! - `imageproxy_cache_lookups_total` (counter): by cache layer and result
//! - `imageproxy_transforms_total` (counter): by outcome
//! - `imageproxy_route_mapping_refreshes_total` (counter): by outcome

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(status: u16, start: Instant) {
    counter!("imageproxy_requests_total", "status" => status.to_string()).increment(1);
    histogram!("imageproxy_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_cache_lookup(layer: &'static str, hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("imageproxy_cache_lookups_total", "layer" => layer, "result" => result).increment(1);
}

pub fn record_transform(success: bool) {
    let outcome = if success { "ok" } else { "error" };
    counter!("imageproxy_transforms_total", "outcome" => outcome).increment(1);
}

pub fn record_mapping_refresh(success: bool) {
    let outcome = if success { "ok" } else { "error" };
    counter!("imageproxy_route_mapping_refreshes_total", "outcome" => outcome).increment(1);
}
