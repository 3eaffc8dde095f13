//! Document database subsystem.
//!
//! # Data Flow
//! ```text
//! DatabaseConfig (MONGO_URI)
//!     → connect() picks a backend by URI scheme
//!         mongodb:// | mongodb+srv:// → mongo.rs (driver, ping on connect)
//!         memory://                   → memory.rs (in-process)
//!     → Arc<dyn DocumentStore> shared by every resource router
//! ```
//!
//! # Design Decisions
//! - Connect once at startup; no retry, a failed connect aborts startup
//! - Documents cross the seam as JSON objects with a string `_id`
//! - Driver pooling stays inside the driver

pub mod memory;
pub mod mongo;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::config::DatabaseConfig;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// A JSON document as stored in a collection.
pub type Document = Map<String, Value>;

/// Errors surfaced by a document store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The id is not a well-formed document id.
    #[error("Resource not found with id of {0}")]
    InvalidId(String),

    /// A unique index rejected the write.
    #[error("Duplicate field value entered")]
    Duplicate,

    /// The document could not be encoded for the backend.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Database error: {0}")]
    Backend(String),
}

/// CRUD access to named collections of JSON documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    /// All documents whose top-level fields equal every entry of `filter`.
    async fn list(&self, collection: &str, filter: &Document) -> Result<Vec<Document>, StoreError>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Insert a document and return it with its assigned `_id`.
    async fn create(&self, collection: &str, document: Document) -> Result<Document, StoreError>;

    /// Merge `changes` into the document and return the updated document.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        changes: Document,
    ) -> Result<Option<Document>, StoreError>;

    /// Returns false when no document had that id.
    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError>;
}

/// Connect to the configured database.
pub async fn connect(config: &DatabaseConfig) -> Result<Arc<dyn DocumentStore>, StoreError> {
    let uri = config
        .uri
        .as_deref()
        .ok_or_else(|| StoreError::Backend("MONGO_URI is not set".to_string()))?;

    let store: Arc<dyn DocumentStore> = if uri.starts_with("memory://") {
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(MongoStore::connect(uri, &config.name).await?)
    };

    tracing::info!(backend = store.backend(), database = %config.name, "Database connected");
    Ok(store)
}

/// True when `document` has every `filter` field with an equal value.
///
/// Filter values usually come from the query string and are therefore strings;
/// a string filter also matches a number or boolean with the same text.
pub(crate) fn matches_filter(document: &Document, filter: &Document) -> bool {
    filter.iter().all(|(key, expected)| match (document.get(key), expected) {
        (Some(actual), expected) if actual == expected => true,
        (Some(Value::Number(n)), Value::String(s)) => n.to_string() == *s,
        (Some(Value::Bool(b)), Value::String(s)) => b.to_string() == *s,
        _ => false,
    })
}
