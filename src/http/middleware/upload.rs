//! Multipart file upload stage.
//!
//! `multipart/form-data` bodies are decoded here. File parts become an
//! `UploadedFiles` extension; plain text parts are merged into the decoded
//! body so later stages sanitize them like any other body field.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header::CONTENT_TYPE, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use multer::{Constraints, Multipart, SizeLimit};
use serde_json::Value;

use crate::http::error::ApiError;
use crate::http::request::{RequestBody, UploadedFile, UploadedFiles};

/// Upload limits shared by every request.
#[derive(Debug, Clone, Copy)]
pub struct UploadLimits {
    /// Largest accepted part, in bytes.
    pub max_file_size: u64,
}

fn multipart_boundary(headers: &HeaderMap) -> Option<String> {
    let content_type = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    if !content_type
        .trim_start()
        .to_ascii_lowercase()
        .starts_with("multipart/form-data")
    {
        return None;
    }
    multer::parse_boundary(content_type).ok()
}

fn map_multer_error(err: multer::Error, limit: u64) -> ApiError {
    match err {
        multer::Error::FieldSizeExceeded { .. } | multer::Error::StreamSizeExceeded { .. } => {
            ApiError::PayloadTooLarge(format!("Please upload a file less than {} bytes", limit))
        }
        other => ApiError::BadRequest(format!("Malformed multipart body: {}", other)),
    }
}

async fn read_parts(
    mut multipart: Multipart<'static>,
    limit: u64,
) -> Result<(UploadedFiles, Vec<(String, String)>), ApiError> {
    let mut files = Vec::new();
    let mut fields = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| map_multer_error(e, limit))?
    {
        let name = field.name().map(str::to_string).unwrap_or_default();
        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let content_type = field.content_type().map(|m| m.essence_str().to_string());
                let data = field.bytes().await.map_err(|e| map_multer_error(e, limit))?;
                tracing::debug!(field = %name, file = %file_name, size = data.len(), "Received upload");
                files.push(UploadedFile {
                    field: name,
                    file_name,
                    content_type,
                    data,
                });
            }
            None => {
                let text = field.text().await.map_err(|e| map_multer_error(e, limit))?;
                fields.push((name, text));
            }
        }
    }

    Ok((UploadedFiles(files), fields))
}

pub async fn handle_uploads(
    State(limits): State<UploadLimits>,
    request: Request,
    next: Next,
) -> Response {
    let Some(boundary) = multipart_boundary(request.headers()) else {
        return next.run(request).await;
    };

    let (mut parts, body) = request.into_parts();
    let constraints =
        Constraints::new().size_limit(SizeLimit::new().per_field(limits.max_file_size));
    let multipart = Multipart::with_constraints(body.into_data_stream(), boundary, constraints);

    let (files, fields) = match read_parts(multipart, limits.max_file_size).await {
        Ok(decoded) => decoded,
        Err(err) => return err.into_response(),
    };

    if !fields.is_empty() {
        if parts.extensions.get::<RequestBody>().is_none() {
            parts.extensions.insert(RequestBody::default());
        }
        if let Some(RequestBody(Value::Object(map))) = parts.extensions.get_mut::<RequestBody>() {
            for (name, text) in fields {
                map.insert(name, Value::String(text));
            }
        }
    }

    parts.extensions.insert(files);
    next.run(Request::from_parts(parts, Body::empty())).await
}
