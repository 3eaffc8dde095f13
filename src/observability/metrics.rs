//! Prometheus metrics.
//!
//! # Metrics
//! - `http_requests_total` (counter): requests by method and status
//! - `http_request_duration_seconds` (histogram): end-to-end latency
//! - `rate_limited_total` (counter): requests rejected by the rate limiter
//!
//! Recording is always cheap; nothing is exported unless `init_metrics` ran.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the global recorder and serve `/metrics` on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let status = status.to_string();
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "status" => status.clone()
    )
    .increment(1);
    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "status" => status
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited() {
    metrics::counter!("rate_limited_total").increment(1);
}

/// Outermost layer: counts every request, static assets and rejections included.
pub async fn track_requests(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let response = next.run(request).await;
    record_request(&method, response.status().as_u16(), start);
    response
}
