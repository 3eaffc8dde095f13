//! Decoded request data shared between pipeline stages and handlers.
//!
//! # Responsibilities
//! - Carry the decoded JSON body, cookies and uploads as request extensions
//! - Read and rewrite the query string for the stages that sanitize it
//! - Give handlers extractors over the sanitized data
//!
//! # Design Decisions
//! - The body decoder drains the raw body, so handlers can only see the
//!   sanitized `RequestBody`, never the bytes the client sent
//! - Query rewriting keeps the path untouched and re-encodes the pairs

use std::collections::HashMap;
use std::convert::Infallible;

use axum::{
    body::Bytes,
    extract::{FromRequestParts, Request},
    http::{request::Parts, uri::PathAndQuery, Uri},
};
use axum_extra::extract::cookie::CookieJar;
use serde_json::{Map, Value};
use url::form_urlencoded;

/// Decoded request body. A JSON object (possibly empty) unless the client sent
/// a JSON array.
#[derive(Debug, Clone)]
pub struct RequestBody(pub Value);

impl Default for RequestBody {
    fn default() -> Self {
        Self(Value::Object(Map::new()))
    }
}

/// Cookies decoded from the `Cookie` header.
#[derive(Debug, Clone, Default)]
pub struct RequestCookies(pub CookieJar);

/// One file received in a multipart body.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Form field the file was sent under.
    pub field: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl UploadedFile {
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Extension of the client-side file name including the dot, if any.
    pub fn extension(&self) -> Option<&str> {
        self.file_name.rfind('.').map(|i| &self.file_name[i..])
    }
}

/// Files decoded by the upload stage, in the order they were received.
#[derive(Debug, Clone, Default)]
pub struct UploadedFiles(pub Vec<UploadedFile>);

impl UploadedFiles {
    /// First file sent under `field`.
    pub fn get(&self, field: &str) -> Option<&UploadedFile> {
        self.0.iter().find(|f| f.field == field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Every value of each repeated query name, as seen by the parameter-pollution guard.
#[derive(Debug, Clone, Default)]
pub struct PollutedQuery(pub HashMap<String, Vec<String>>);

/// Extractor for the sanitized body.
///
/// Falls back to an empty object when no body decoder ran.
#[derive(Debug, Clone)]
pub struct Payload(pub Value);

impl<S: Send + Sync> FromRequestParts<S> for Payload {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let body = parts
            .extensions
            .get::<RequestBody>()
            .cloned()
            .unwrap_or_default();
        Ok(Payload(body.0))
    }
}

/// Reads the cookies decoded by the pipeline, or parses the header when the
/// cookie stage did not run.
impl<S: Send + Sync> FromRequestParts<S> for RequestCookies {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestCookies>()
            .cloned()
            .unwrap_or_else(|| RequestCookies(CookieJar::from_headers(&parts.headers))))
    }
}

/// Extractor for the uploaded files; empty when none were sent.
#[derive(Debug, Clone, Default)]
pub struct Uploads(pub UploadedFiles);

impl<S: Send + Sync> FromRequestParts<S> for Uploads {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Uploads(
            parts
                .extensions
                .get::<UploadedFiles>()
                .cloned()
                .unwrap_or_default(),
        ))
    }
}

/// Decoded query pairs in the order they appear in the URI.
pub fn query_pairs(uri: &Uri) -> Vec<(String, String)> {
    uri.query()
        .map(|q| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

/// Replace the request's query string with `pairs`.
pub fn set_query(request: &mut Request, pairs: &[(String, String)]) -> Result<(), axum::http::Error> {
    let path = request.uri().path();
    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();

    let path_and_query = if query.is_empty() {
        PathAndQuery::try_from(path)?
    } else {
        PathAndQuery::try_from(format!("{}?{}", path, query))?
    };

    let mut parts = request.uri().clone().into_parts();
    parts.path_and_query = Some(path_and_query);
    *request.uri_mut() = Uri::from_parts(parts)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_query_pairs_decodes_in_order() {
        let uri: Uri = "/api/v2/courses?minimumSkill=beginner&sort=-title&tuition%5Blte%5D=1000"
            .parse()
            .unwrap();
        assert_eq!(
            query_pairs(&uri),
            vec![
                ("minimumSkill".to_string(), "beginner".to_string()),
                ("sort".to_string(), "-title".to_string()),
                ("tuition[lte]".to_string(), "1000".to_string()),
            ]
        );
    }

    #[test]
    fn test_set_query_rewrites_only_the_query() {
        let mut request = Request::builder()
            .uri("http://localhost:5000/api/v2/bootcamps?a=1&a=2")
            .body(Body::empty())
            .unwrap();

        set_query(&mut request, &[("a".to_string(), "2".to_string())]).unwrap();
        assert_eq!(request.uri().path(), "/api/v2/bootcamps");
        assert_eq!(request.uri().query(), Some("a=2"));
        assert_eq!(request.uri().host(), Some("localhost"));
    }

    #[test]
    fn test_set_query_with_no_pairs_drops_the_query() {
        let mut request = Request::builder()
            .uri("/api/v2/bootcamps?%24where=1")
            .body(Body::empty())
            .unwrap();

        set_query(&mut request, &[]).unwrap();
        assert_eq!(request.uri().query(), None);
    }

    #[test]
    fn test_uploaded_file_extension() {
        let file = UploadedFile {
            field: "file".into(),
            file_name: "bootcamp.photo.jpg".into(),
            content_type: Some("image/jpeg".into()),
            data: Bytes::from_static(b"jpeg"),
        };
        assert_eq!(file.extension(), Some(".jpg"));
        assert_eq!(file.size(), 4);
    }
}
