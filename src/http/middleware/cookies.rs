//! Cookie decoder stage.

use axum::{extract::Request, middleware::Next, response::Response};
use axum_extra::extract::cookie::CookieJar;

use crate::http::request::RequestCookies;

/// Parse the `Cookie` header into a `RequestCookies` extension.
pub async fn decode_cookies(mut request: Request, next: Next) -> Response {
    let jar = CookieJar::from_headers(request.headers());
    request.extensions_mut().insert(RequestCookies(jar));
    next.run(request).await
}
