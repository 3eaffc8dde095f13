//! Development request logger stage.
//!
//! Emits one line per completed request in the shape
//! `GET /api/v2/bootcamps 200 3.141 ms - 52`.

use std::time::Instant;

use axum::{
    body::HttpBody,
    extract::Request,
    http::header::CONTENT_LENGTH,
    middleware::Next,
    response::Response,
};

/// Tracing target of the request lines, so they can be filtered on their own.
pub const REQUEST_LOG_TARGET: &str = "bootcamp_api::request";

pub async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let url = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let start = Instant::now();

    let response = next.run(request).await;

    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    let length = response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| response.body().size_hint().exact().map(|n| n.to_string()))
        .unwrap_or_else(|| "-".to_string());

    tracing::info!(
        target: REQUEST_LOG_TARGET,
        "{} {} {} {:.3} ms - {}",
        method,
        url,
        response.status().as_u16(),
        elapsed_ms,
        length
    );

    response
}
