//! API error type and the terminal error handler.
//!
//! Every error response leaving the routers has the same JSON envelope:
//! `{"success": false, "error": "<message>"}`. Handlers return `ApiError`
//! directly; anything else that produces an error status (extractor rejections,
//! unmatched routes, wrong methods, panics) is re-rendered by `error_handler`.

use std::any::Any;

use axum::{
    body::Body,
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::db::StoreError;

/// Upper bound on how much of a framework error body is kept as the message.
const MAX_REJECTION_BODY: usize = 16 * 1024;

/// Marks a response that was already rendered by `ApiError`.
#[derive(Debug, Clone, Copy)]
struct RenderedError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Duplicate field value entered")]
    Duplicate,

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    /// A framework rejection re-rendered with its original status.
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    /// Details are logged, never sent to the client.
    #[error("Server Error")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::Duplicate => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Rejected { status, .. } => *status,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidId(_) => ApiError::NotFound(err.to_string()),
            StoreError::Duplicate => ApiError::Duplicate,
            StoreError::InvalidDocument(msg) => ApiError::BadRequest(msg),
            StoreError::Backend(msg) => ApiError::Internal(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let ApiError::Internal(detail) = &self {
            tracing::error!(error = %detail, "Internal server error");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "Request failed");
        }

        let body = json!({
            "success": false,
            "error": self.to_string(),
        });

        let mut response = (status, Json(body)).into_response();
        response.extensions_mut().insert(RenderedError);
        response
    }
}

/// Terminal error handler, mounted around the routers.
///
/// Responses already rendered by `ApiError` pass through untouched. Other
/// error responses are converted so clients never see a framework default.
pub async fn error_handler(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error())
        || response.extensions().get::<RenderedError>().is_some()
    {
        return response;
    }

    let (parts, body) = response.into_parts();
    let message = match axum::body::to_bytes(body, MAX_REJECTION_BODY).await {
        Ok(bytes) if !bytes.is_empty() => String::from_utf8_lossy(&bytes).trim().to_string(),
        _ => status.canonical_reason().unwrap_or("Error").to_string(),
    };

    let error = match status {
        StatusCode::NOT_FOUND | StatusCode::METHOD_NOT_ALLOWED => ApiError::Rejected {
            status,
            message: format!("Cannot {} {}", method, path),
        },
        s if s.is_server_error() => ApiError::Internal(message),
        s => ApiError::Rejected { status: s, message },
    };

    let mut rendered = error.into_response();
    if let Some(allow) = parts.headers.get(header::ALLOW) {
        rendered.headers_mut().insert(header::ALLOW, allow.clone());
    }
    rendered
}

/// Panic hook for `CatchPanicLayer`: a panicking handler becomes a 500.
pub fn render_panic(panic: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    ApiError::Internal(format!("handler panicked: {}", detail)).into_response()
}
