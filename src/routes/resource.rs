//! Generic CRUD router over one collection.
//!
//! ```text
//! GET    /        list, equality filters from the query string
//! POST   /        create (201)
//! GET    /{id}    show
//! PUT    /{id}    merge changes
//! DELETE /{id}    remove
//! ```

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Extension, Json, Router,
};
use serde_json::{json, Map, Value};

use crate::db::Document;
use crate::http::error::ApiError;
use crate::http::request::{Payload, Uploads};
use crate::http::server::AppState;

/// Query names that shape the listing rather than filter it.
const RESERVED_QUERY_KEYS: [&str; 4] = ["select", "sort", "page", "limit"];

/// Collection a router instance serves.
#[derive(Debug, Clone, Copy)]
pub struct Collection(pub &'static str);

pub fn resource_router(collection: &'static str) -> Router<AppState> {
    crud_routes().layer(Extension(Collection(collection)))
}

/// Bootcamps also accept a photo upload.
pub fn bootcamp_router() -> Router<AppState> {
    crud_routes()
        .route("/{id}/photo", put(upload_photo))
        .layer(Extension(Collection("bootcamps")))
}

fn crud_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(show).put(update).delete(remove))
}

fn not_found(id: &str) -> ApiError {
    ApiError::NotFound(format!("Resource not found with id of {}", id))
}

fn into_document(body: Value) -> Result<Document, ApiError> {
    match body {
        Value::Object(mut map) => {
            map.remove("_id");
            Ok(map)
        }
        _ => Err(ApiError::BadRequest(
            "Request body must be a JSON object".to_string(),
        )),
    }
}

fn filter_from_query(query: HashMap<String, String>) -> Document {
    query
        .into_iter()
        .filter(|(key, _)| !RESERVED_QUERY_KEYS.contains(&key.as_str()) && !key.contains('['))
        .map(|(key, value)| (key, Value::String(value)))
        .collect::<Map<_, _>>()
}

async fn list(
    State(state): State<AppState>,
    Extension(Collection(collection)): Extension<Collection>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = filter_from_query(query);
    let documents = state.store.list(collection, &filter).await?;
    Ok(Json(json!({
        "success": true,
        "count": documents.len(),
        "data": documents,
    })))
}

async fn show(
    State(state): State<AppState>,
    Extension(Collection(collection)): Extension<Collection>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let document = state
        .store
        .get(collection, &id)
        .await?
        .ok_or_else(|| not_found(&id))?;
    Ok(Json(json!({ "success": true, "data": document })))
}

async fn create(
    State(state): State<AppState>,
    Extension(Collection(collection)): Extension<Collection>,
    Payload(body): Payload,
) -> Result<impl IntoResponse, ApiError> {
    let document = state.store.create(collection, into_document(body)?).await?;
    tracing::debug!(collection, id = ?document.get("_id"), "Created document");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": document })),
    ))
}

async fn update(
    State(state): State<AppState>,
    Extension(Collection(collection)): Extension<Collection>,
    Path(id): Path<String>,
    Payload(body): Payload,
) -> Result<impl IntoResponse, ApiError> {
    let document = state
        .store
        .update(collection, &id, into_document(body)?)
        .await?
        .ok_or_else(|| not_found(&id))?;
    Ok(Json(json!({ "success": true, "data": document })))
}

async fn remove(
    State(state): State<AppState>,
    Extension(Collection(collection)): Extension<Collection>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.store.delete(collection, &id).await? {
        return Err(not_found(&id));
    }
    Ok(Json(json!({ "success": true, "data": {} })))
}

async fn upload_photo(
    State(state): State<AppState>,
    Extension(Collection(collection)): Extension<Collection>,
    Path(id): Path<String>,
    Uploads(files): Uploads,
) -> Result<impl IntoResponse, ApiError> {
    if state.store.get(collection, &id).await?.is_none() {
        return Err(not_found(&id));
    }

    let file = files
        .get("file")
        .ok_or_else(|| ApiError::BadRequest("Please upload a file".to_string()))?;

    let is_image = file
        .content_type
        .as_deref()
        .is_some_and(|ct| ct.starts_with("image"));
    if !is_image {
        return Err(ApiError::BadRequest("Please upload an image file".to_string()));
    }

    let photo = format!("photo_{}{}", id, file.extension().unwrap_or_default());
    let mut changes = Document::new();
    changes.insert("photo".to_string(), Value::String(photo.clone()));
    state
        .store
        .update(collection, &id, changes)
        .await?
        .ok_or_else(|| not_found(&id))?;

    tracing::info!(collection, id = %id, photo = %photo, size = file.size(), "Photo uploaded");
    Ok(Json(json!({ "success": true, "data": photo })))
}
