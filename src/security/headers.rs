//! Protective response headers.
//!
//! The header set is built once at startup and shared by every request. A
//! header a handler already set is never overwritten.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{
        header::{
            CONTENT_SECURITY_POLICY, REFERRER_POLICY, STRICT_TRANSPORT_SECURITY,
            X_CONTENT_TYPE_OPTIONS, X_DNS_PREFETCH_CONTROL, X_FRAME_OPTIONS, X_XSS_PROTECTION,
        },
        HeaderMap, HeaderName, HeaderValue,
    },
    middleware::Next,
    response::Response,
};

const DEFAULT_CSP: &str = "default-src 'self';base-uri 'self';font-src 'self' https: data:;\
form-action 'self';frame-ancestors 'self';img-src 'self' data:;object-src 'none';\
script-src 'self';script-src-attr 'none';style-src 'self' https: 'unsafe-inline';\
upgrade-insecure-requests";

const X_POWERED_BY: HeaderName = HeaderName::from_static("x-powered-by");

/// Build the default protective header set.
#[must_use]
pub fn build_security_headers() -> Arc<HeaderMap> {
    let mut headers = HeaderMap::new();

    headers.insert(CONTENT_SECURITY_POLICY, HeaderValue::from_static(DEFAULT_CSP));
    headers.insert(
        HeaderName::from_static("cross-origin-opener-policy"),
        HeaderValue::from_static("same-origin"),
    );
    headers.insert(
        HeaderName::from_static("cross-origin-resource-policy"),
        HeaderValue::from_static("same-origin"),
    );
    headers.insert(
        HeaderName::from_static("origin-agent-cluster"),
        HeaderValue::from_static("?1"),
    );
    headers.insert(REFERRER_POLICY, HeaderValue::from_static("no-referrer"));
    headers.insert(
        STRICT_TRANSPORT_SECURITY,
        HeaderValue::from_static("max-age=15552000; includeSubDomains"),
    );
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(X_DNS_PREFETCH_CONTROL, HeaderValue::from_static("off"));
    headers.insert(
        HeaderName::from_static("x-download-options"),
        HeaderValue::from_static("noopen"),
    );
    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("SAMEORIGIN"));
    headers.insert(
        HeaderName::from_static("x-permitted-cross-domain-policies"),
        HeaderValue::from_static("none"),
    );
    // Disables the legacy browser auditor.
    headers.insert(X_XSS_PROTECTION, HeaderValue::from_static("0"));

    Arc::new(headers)
}

/// Add the shared header set to every response passing through.
pub async fn security_headers(
    State(headers): State<Arc<HeaderMap>>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    let response_headers = response.headers_mut();
    response_headers.remove(X_POWERED_BY);
    for (name, value) in headers.iter() {
        if !response_headers.contains_key(name) {
            response_headers.insert(name.clone(), value.clone());
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, middleware, routing::get, Router};
    use tower::ServiceExt;

    #[test]
    fn test_default_headers_are_present() {
        let headers = build_security_headers();

        assert_eq!(headers.get(X_CONTENT_TYPE_OPTIONS).unwrap(), "nosniff");
        assert_eq!(headers.get(X_FRAME_OPTIONS).unwrap(), "SAMEORIGIN");
        assert_eq!(headers.get(X_XSS_PROTECTION).unwrap(), "0");
        assert!(headers
            .get(STRICT_TRANSPORT_SECURITY)
            .and_then(|v| v.to_str().ok())
            .unwrap()
            .contains("includeSubDomains"));
        assert!(headers.contains_key(CONTENT_SECURITY_POLICY));
    }

    #[tokio::test]
    async fn test_handler_headers_are_not_overwritten() {
        let app = Router::new()
            .route(
                "/",
                get(|| async { ([(X_FRAME_OPTIONS, "DENY"), (X_POWERED_BY, "Express")], "ok") }),
            )
            .layer(middleware::from_fn_with_state(build_security_headers(), security_headers));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.headers().get(X_FRAME_OPTIONS).unwrap(), "DENY");
        assert_eq!(response.headers().get(REFERRER_POLICY).unwrap(), "no-referrer");
        assert!(!response.headers().contains_key(X_POWERED_BY));
    }
}
