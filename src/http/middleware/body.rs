//! JSON body decoder stage.

use axum::{
    body::Body,
    extract::Request,
    http::header::CONTENT_TYPE,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;

use crate::http::error::ApiError;
use crate::http::request::RequestBody;

/// Largest JSON body accepted (100 KiB).
pub const JSON_BODY_LIMIT: usize = 100 * 1024;

fn is_json(request: &Request) -> bool {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| {
            ct.split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .eq_ignore_ascii_case("application/json")
        })
        .unwrap_or(false)
}

/// Decode `application/json` bodies into a `RequestBody` extension.
///
/// Every request leaves this stage with a `RequestBody`; requests that carry
/// no JSON get an empty object. JSON bodies are drained so later stages and
/// handlers only see the decoded value. Other bodies are left for later stages.
pub async fn decode_json_body(request: Request, next: Next) -> Response {
    if !is_json(&request) {
        let mut request = request;
        request.extensions_mut().insert(RequestBody::default());
        return next.run(request).await;
    }

    let (mut parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, JSON_BODY_LIMIT).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return ApiError::PayloadTooLarge("request entity too large".to_string()).into_response()
        }
    };

    let value = if bytes.iter().all(u8::is_ascii_whitespace) {
        RequestBody::default()
    } else {
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(value @ (Value::Object(_) | Value::Array(_))) => RequestBody(value),
            Ok(_) => {
                return ApiError::BadRequest("JSON body must be an object or array".to_string())
                    .into_response()
            }
            Err(e) => {
                return ApiError::BadRequest(format!("Malformed JSON body: {}", e)).into_response()
            }
        }
    };

    parts.extensions.insert(value);
    next.run(Request::from_parts(parts, Body::empty())).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, middleware, routing::post, Router};
    use tower::ServiceExt;

    use crate::http::request::Payload;

    fn app() -> Router {
        Router::new()
            .route("/", post(|Payload(body): Payload| async move { axum::Json(body) }))
            .layer(middleware::from_fn(decode_json_body))
    }

    async fn send(content_type: Option<&str>, body: impl Into<Body>) -> Response {
        let mut builder = Request::builder().method("POST").uri("/");
        if let Some(ct) = content_type {
            builder = builder.header(CONTENT_TYPE, ct);
        }
        app().oneshot(builder.body(body.into()).unwrap()).await.unwrap()
    }

    async fn json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_json_object_is_decoded() {
        let response = send(Some("application/json; charset=utf-8"), r#"{"name":"Devworks"}"#).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await, serde_json::json!({"name": "Devworks"}));
    }

    #[tokio::test]
    async fn test_non_json_gets_empty_object() {
        let response = send(Some("text/plain"), "name=Devworks").await;
        assert_eq!(json(response).await, serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_malformed_json_is_rejected() {
        let response = send(Some("application/json"), "{\"name\":").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(response).await["success"], false);
    }

    #[tokio::test]
    async fn test_scalar_json_is_rejected() {
        let response = send(Some("application/json"), "\"just a string\"").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let big = format!("{{\"bio\":\"{}\"}}", "a".repeat(JSON_BODY_LIMIT));
        let response = send(Some("application/json"), big).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
