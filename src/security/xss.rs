//! Markup escaping for user input.
//!
//! Every `<` in body strings, body keys, query names and query values is
//! replaced with `&lt;`, so stored input can never open a tag when rendered.

use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value};

use crate::http::error::ApiError;
use crate::http::request::{query_pairs, set_query, RequestBody};

pub fn escape_markup(input: &str) -> String {
    input.replace('<', "&lt;")
}

/// Escape every string in `value`, keys included.
pub fn clean_value(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(escape_markup(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(clean_value).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (escape_markup(&k), clean_value(v)))
                .collect::<Map<_, _>>(),
        ),
        other => other,
    }
}

pub async fn xss_clean(mut request: Request, next: Next) -> Response {
    if let Some(RequestBody(body)) = request.extensions_mut().get_mut::<RequestBody>() {
        *body = clean_value(std::mem::take(body));
    }

    let pairs = query_pairs(request.uri());
    if pairs.iter().any(|(k, v)| k.contains('<') || v.contains('<')) {
        let cleaned: Vec<_> = pairs
            .iter()
            .map(|(k, v)| (escape_markup(k), escape_markup(v)))
            .collect();
        if let Err(e) = set_query(&mut request, &cleaned) {
            return ApiError::BadRequest(format!("Invalid query string: {}", e)).into_response();
        }
    }

    next.run(request).await
}
