//! Static asset stage.
//!
//! GET and HEAD requests that resolve to a file under the public directory are
//! answered here and never reach later stages. Everything else falls through.

use std::path::Path;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{Method, StatusCode, Uri},
    middleware::Next,
    response::Response,
};
use tower::ServiceExt;
use tower_http::services::ServeDir;

/// Shared file server for the public directory.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    serve_dir: ServeDir,
}

impl StaticFiles {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            serve_dir: ServeDir::new(root.as_ref()),
        }
    }
}

pub async fn serve_static(
    State(files): State<StaticFiles>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() != Method::GET && request.method() != Method::HEAD {
        return next.run(request).await;
    }

    let mut found = files.lookup(&request, request.uri().clone()).await;

    // Trailing slashes are trimmed before routing, so a directory redirect
    // would bounce straight back here. Look up its index directly instead.
    if matches!(&found, Some(r) if r.status() == StatusCode::TEMPORARY_REDIRECT) {
        found = match format!("{}/", request.uri().path()).parse::<Uri>() {
            Ok(uri) => files.lookup(&request, uri).await,
            Err(_) => None,
        };
    }

    match found {
        Some(response)
            if response.status() != StatusCode::NOT_FOUND
                && response.status() != StatusCode::TEMPORARY_REDIRECT =>
        {
            tracing::debug!(path = %request.uri().path(), "Served static asset");
            response
        }
        _ => next.run(request).await,
    }
}

impl StaticFiles {
    fn lookup(
        &self,
        request: &Request,
        uri: Uri,
    ) -> impl std::future::Future<Output = Option<Response>> + Send + 'static {
        let mut file_request = Request::new(Body::empty());
        *file_request.method_mut() = request.method().clone();
        *file_request.uri_mut() = uri;
        *file_request.headers_mut() = request.headers().clone();
        let serve_dir = self.serve_dir.clone();

        async move {
            let response = serve_dir.oneshot(file_request).await.ok()?;
            Some(response.map(Body::new))
        }
    }
}
