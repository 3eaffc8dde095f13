//! Authentication routes.
//!
//! Tokens are issued and verified elsewhere; these routes only look at
//! whether the client presents one.

use axum::{
    http::{header::AUTHORIZATION, HeaderMap},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde_json::json;
use time::Duration as TimeDuration;

use crate::http::error::ApiError;
use crate::http::request::RequestCookies;
use crate::http::server::AppState;

pub const TOKEN_COOKIE: &str = "token";

/// Value written over the token cookie on logout.
const CLEARED_TOKEN: &str = "none";

/// Lifetime of the cleared cookie.
const CLEARED_TOKEN_TTL: TimeDuration = TimeDuration::seconds(10);

pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/logout", get(logout))
        .route("/me", get(me))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn cookie_token(cookies: &RequestCookies) -> Option<String> {
    cookies
        .0
        .get(TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty() && v != CLEARED_TOKEN)
}

async fn logout(jar: CookieJar) -> impl IntoResponse {
    let cleared = Cookie::build((TOKEN_COOKIE, CLEARED_TOKEN))
        .path("/")
        .http_only(true)
        .max_age(CLEARED_TOKEN_TTL)
        .build();

    (jar.add(cleared), Json(json!({ "success": true, "data": {} })))
}

async fn me(headers: HeaderMap, cookies: RequestCookies) -> Result<impl IntoResponse, ApiError> {
    let has_token = bearer_token(&headers).is_some() || cookie_token(&cookies).is_some();
    if !has_token {
        return Err(ApiError::Unauthorized(
            "Not authorized to access this route".to_string(),
        ));
    }
    Ok(Json(json!({ "success": true, "data": { "authenticated": true } })))
}
