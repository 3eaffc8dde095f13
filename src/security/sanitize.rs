//! Operator-injection guard.
//!
//! Strips keys that a document database would read as query operators or
//! nested paths: any key starting with `$` or containing `.`. Applies to the
//! decoded body at every depth and to each bracket segment of query names
//! (`price[$gt]=1` is dropped).

use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;

use crate::http::error::ApiError;
use crate::http::request::{query_pairs, set_query, RequestBody};

pub fn is_forbidden_key(key: &str) -> bool {
    key.starts_with('$') || key.contains('.')
}

/// Split `a[b][c]` into `a`, `b`, `c`.
fn query_key_segments(key: &str) -> impl Iterator<Item = &str> {
    key.split(|c| c == '[' || c == ']').filter(|s| !s.is_empty())
}

fn is_forbidden_query_key(key: &str) -> bool {
    query_key_segments(key).any(is_forbidden_key)
}

/// Remove forbidden keys from `value` in place, at any depth.
///
/// Returns how many keys were removed.
pub fn sanitize_value(value: &mut Value) -> usize {
    match value {
        Value::Object(map) => {
            let before = map.len();
            map.retain(|key, _| !is_forbidden_key(key));
            let mut removed = before - map.len();
            for nested in map.values_mut() {
                removed += sanitize_value(nested);
            }
            removed
        }
        Value::Array(items) => items.iter_mut().map(sanitize_value).sum(),
        _ => 0,
    }
}

pub async fn mongo_sanitize(mut request: Request, next: Next) -> Response {
    let mut removed = 0;

    if let Some(RequestBody(body)) = request.extensions_mut().get_mut::<RequestBody>() {
        removed += sanitize_value(body);
    }

    let pairs = query_pairs(request.uri());
    let kept: Vec<_> = pairs
        .iter()
        .filter(|(key, _)| !is_forbidden_query_key(key))
        .cloned()
        .collect();

    if kept.len() != pairs.len() {
        removed += pairs.len() - kept.len();
        if let Err(e) = set_query(&mut request, &kept) {
            return ApiError::BadRequest(format!("Invalid query string: {}", e)).into_response();
        }
    }

    if removed > 0 {
        tracing::warn!(
            path = %request.uri().path(),
            removed,
            "Stripped operator keys from request"
        );
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_forbidden_keys() {
        assert!(is_forbidden_key("$gt"));
        assert!(is_forbidden_key("location.city"));
        assert!(!is_forbidden_key("price$"));
        assert!(!is_forbidden_key("name"));
    }

    #[test]
    fn test_nested_keys_are_removed() {
        let mut body = json!({
            "email": {"$gt": ""},
            "password": "123456",
            "profile": {"address.city": "Boston", "tags": [{"$where": "1"}, {"ok": true}]},
        });

        let removed = sanitize_value(&mut body);

        assert_eq!(removed, 3);
        assert_eq!(
            body,
            json!({
                "email": {},
                "password": "123456",
                "profile": {"tags": [{}, {"ok": true}]},
            })
        );
    }

    #[test]
    fn test_query_bracket_segments_are_checked() {
        assert!(is_forbidden_query_key("price[$gt]"));
        assert!(is_forbidden_query_key("$where"));
        assert!(is_forbidden_query_key("a[b.c]"));
        assert!(!is_forbidden_query_key("averageCost[lte]"));
    }
}
