//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, status, pass
//! - `proxy_request_duration_seconds` (histogram): latency by pass
//! - `proxy_rewrite_bytes_total` (counter): rewritten output bytes by pass
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - The Prometheus exporter serves its own HTTP listener

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record one finished request.
pub fn record_request(method: &str, status: u16, pass: &str, start: Instant) {
    counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "pass" => pass.to_string()
    )
    .increment(1);
    histogram!("proxy_request_duration_seconds", "pass" => pass.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Record the size of a rewritten body.
pub fn record_rewrite(pass: &str, bytes: usize) {
    counter!("proxy_rewrite_bytes_total", "pass" => pass.to_string()).increment(bytes as u64);
}
