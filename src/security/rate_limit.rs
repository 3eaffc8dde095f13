//! Fixed-window rate limiting per client address.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::{header::RETRY_AFTER, HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;
use tokio::time::Instant;

use crate::config::RateLimitConfig;
use crate::lifecycle::shutdown::StopListener;
use crate::observability::metrics;

pub const RATE_LIMIT_MESSAGE: &str = "Too many requests, please try again later.";

const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Counter for one client, anchored at the client's first request.
struct FixedWindow {
    started: Instant,
    hits: u32,
}

/// Outcome of counting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Time until the client's window resets.
    pub reset_after: Duration,
}

impl Decision {
    fn write_headers(&self, headers: &mut HeaderMap) {
        headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(self.limit));
        headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(self.remaining));
        headers.insert(X_RATELIMIT_RESET, HeaderValue::from(reset_secs(self.reset_after)));
    }
}

fn reset_secs(d: Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}

/// Shared counters for the limiter stage.
pub struct RateLimiterState {
    windows: DashMap<String, FixedWindow>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiterState {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            windows: DashMap::new(),
            max_requests: config.max_requests,
            window: config.window(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Count one request for `key`.
    ///
    /// Check and increment happen under the entry lock, so concurrent requests
    /// from one client can never both take the last slot.
    pub fn check(&self, key: &str) -> Decision {
        let now = Instant::now();
        let mut entry = self
            .windows
            .entry(key.to_string())
            .or_insert_with(|| FixedWindow { started: now, hits: 0 });

        if now.duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.hits = 0;
        }
        entry.hits = entry.hits.saturating_add(1);

        Decision {
            allowed: entry.hits <= self.max_requests,
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(entry.hits),
            reset_after: self.window.saturating_sub(now.duration_since(entry.started)),
        }
    }

    /// Drop windows that have expired. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows
            .retain(|_, w| now.duration_since(w.started) < self.window);
        before.saturating_sub(self.windows.len())
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }
}

/// Periodically sweep expired windows until shutdown is signalled.
pub async fn run_sweeper(
    state: Arc<RateLimiterState>,
    mut shutdown: StopListener,
) -> Result<(), Infallible> {
    let mut ticker = tokio::time::interval(state.window());
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let removed = state.sweep();
                if removed > 0 {
                    tracing::debug!(removed, remaining = state.tracked_clients(), "Swept rate-limit windows");
                }
            }
            _ = shutdown.stopped() => {
                tracing::debug!("Rate-limit sweeper stopping");
                return Ok(());
            }
        }
    }
}

fn client_key(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn rate_limit_middleware(
    State(state): State<Arc<RateLimiterState>>,
    request: Request,
    next: Next,
) -> Response {
    let key = client_key(&request);
    let decision = state.check(&key);

    if decision.allowed {
        let mut response = next.run(request).await;
        decision.write_headers(response.headers_mut());
        return response;
    }

    tracing::warn!(client = %key, limit = decision.limit, "Rate limit exceeded");
    metrics::record_rate_limited();

    let mut response = Response::new(Body::from(RATE_LIMIT_MESSAGE));
    *response.status_mut() = StatusCode::TOO_MANY_REQUESTS;
    decision.write_headers(response.headers_mut());
    response
        .headers_mut()
        .insert(RETRY_AFTER, HeaderValue::from(reset_secs(decision.reset_after)));
    response
}
