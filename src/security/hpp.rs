//! HTTP parameter pollution guard.
//!
//! A query name repeated several times keeps only its last value, at the
//! position of its first appearance. Every value of a repeated name is kept
//! in a `PollutedQuery` extension for handlers that want them.

use std::collections::HashMap;

use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::error::ApiError;
use crate::http::request::{query_pairs, set_query, PollutedQuery};

/// Collapse repeated names. Returns the kept pairs and every value per
/// repeated name, in arrival order.
pub fn collapse_repeated(
    pairs: Vec<(String, String)>,
) -> (Vec<(String, String)>, HashMap<String, Vec<String>>) {
    let mut kept: Vec<(String, String)> = Vec::with_capacity(pairs.len());
    let mut values: Vec<Vec<String>> = Vec::with_capacity(pairs.len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    for (key, value) in pairs {
        match positions.get(&key) {
            Some(&index) => {
                values[index].push(value.clone());
                kept[index].1 = value;
            }
            None => {
                positions.insert(key.clone(), kept.len());
                values.push(vec![value.clone()]);
                kept.push((key, value));
            }
        }
    }

    let polluted = kept
        .iter()
        .zip(values)
        .filter(|(_, values)| values.len() > 1)
        .map(|((key, _), values)| (key.clone(), values))
        .collect();
    (kept, polluted)
}

pub async fn parameter_pollution(mut request: Request, next: Next) -> Response {
    let pairs = query_pairs(request.uri());
    let (kept, polluted) = collapse_repeated(pairs);

    if !polluted.is_empty() {
        tracing::debug!(
            names = ?polluted.keys().collect::<Vec<_>>(),
            "Collapsed repeated query parameters"
        );
        if let Err(e) = set_query(&mut request, &kept) {
            return ApiError::BadRequest(format!("Invalid query string: {}", e)).into_response();
        }
    }

    request.extensions_mut().insert(PollutedQuery(polluted));
    next.run(request).await
}
