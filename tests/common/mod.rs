//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::io;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header::CONTENT_TYPE, Request},
    response::Response,
};
use serde_json::Value;
use tower::ServiceExt;
use tracing_subscriber::fmt::MakeWriter;

use bootcamp_api::config::{AppConfig, Environment};
use bootcamp_api::db::MemoryStore;
use bootcamp_api::http::App;
use bootcamp_api::HttpServer;

pub const CLIENT_A: [u8; 4] = [10, 0, 0, 1];
pub const CLIENT_B: [u8; 4] = [10, 0, 0, 2];

/// Config backed by the in-memory store and serving `public_dir`.
pub fn test_config(public_dir: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.environment = Environment::new("Production");
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;
    config.database.uri = Some("memory://".to_string());
    config.static_files.root = public_dir.to_path_buf();
    config
}

pub fn build_server(config: AppConfig) -> HttpServer {
    HttpServer::new(config, Arc::new(MemoryStore::new()))
}

/// Send one request as if it came from `client`.
pub async fn send(app: &App, mut request: Request<Body>, client: [u8; 4]) -> Response {
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from((client, 40000))));
    app.clone().oneshot(request).await.unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Captures formatted log output for assertions.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
