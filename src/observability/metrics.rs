//! Metrics collection and exposition.
//!
//! # Metrics
//! - `admission_checks_total` (counter): by limiter, outcome (allowed/denied)
//! - `limiter_tracked_keys` (gauge): keys holding a record after a sweep
//! - `validation_failures_total` (counter): by field
//! - `http_requests_total` (counter): by method, status
//! - `http_request_duration_seconds` (histogram): latency distribution

use std::net::SocketAddr;
use std::time::Instant;

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_admission(limiter: &'static str, allowed: bool) {
    let outcome = if allowed { "allowed" } else { "denied" };
    metrics::counter!("admission_checks_total", "limiter" => limiter, "outcome" => outcome)
        .increment(1);
}

pub fn record_tracked_keys(limiter: &'static str, keys: usize) {
    metrics::gauge!("limiter_tracked_keys", "limiter" => limiter).set(keys as f64);
}

pub fn record_validation_failure(field: &'static str) {
    metrics::counter!("validation_failures_total", "field" => field).increment(1);
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let method = method.to_string();
    let status = status.to_string();
    metrics::counter!("http_requests_total", "method" => method.clone(), "status" => status.clone())
        .increment(1);
    metrics::histogram!("http_request_duration_seconds", "method" => method, "status" => status)
        .record(start.elapsed().as_secs_f64());
}

/// Middleware recording request count and latency.
pub async fn track_requests(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let response = next.run(request).await;
    record_request(method.as_str(), response.status().as_u16(), start);
    response
}
