//! MongoDB-backed document store.

use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::bson::{self, doc, oid::ObjectId, Bson};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::ReturnDocument;
use mongodb::{Client, Collection, Database};
use serde_json::Value;

use super::{Document, DocumentStore, StoreError};

/// MongoDB server error code for a unique index violation.
const DUPLICATE_KEY: i32 = 11000;

/// Document store backed by one MongoDB database.
#[derive(Debug, Clone)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    /// Connect and verify the server answers a `ping`.
    ///
    /// The database named in the URI wins over `default_name`.
    pub async fn connect(uri: &str, default_name: &str) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(uri).await?;
        let db = client
            .default_database()
            .unwrap_or_else(|| client.database(default_name));

        db.run_command(doc! { "ping": 1 }).await?;

        tracing::debug!(database = %db.name(), "MongoDB ping succeeded");
        Ok(Self { db })
    }

    fn collection(&self, name: &str) -> Collection<bson::Document> {
        self.db.collection(name)
    }
}

fn parse_id(id: &str) -> Result<ObjectId, StoreError> {
    ObjectId::parse_str(id).map_err(|_| StoreError::InvalidId(id.to_string()))
}

fn to_bson(document: &Document) -> Result<bson::Document, StoreError> {
    bson::to_document(document).map_err(|e| StoreError::InvalidDocument(e.to_string()))
}

/// Convert a stored document to JSON, flattening the ObjectId into a hex string.
fn to_json(mut document: bson::Document) -> Document {
    if let Ok(oid) = document.get_object_id("_id") {
        document.insert("_id", oid.to_hex());
    }
    match Bson::Document(document).into_relaxed_extjson() {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        match err.kind.as_ref() {
            ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == DUPLICATE_KEY => {
                StoreError::Duplicate
            }
            ErrorKind::Command(e) if e.code == DUPLICATE_KEY => StoreError::Duplicate,
            _ => StoreError::Backend(err.to_string()),
        }
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    fn backend(&self) -> &'static str {
        "mongodb"
    }

    async fn list(&self, collection: &str, filter: &Document) -> Result<Vec<Document>, StoreError> {
        let cursor = self.collection(collection).find(to_bson(filter)?).await?;
        let docs: Vec<bson::Document> = cursor.try_collect().await?;
        Ok(docs.into_iter().map(to_json).collect())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let oid = parse_id(id)?;
        let found = self.collection(collection).find_one(doc! { "_id": oid }).await?;
        Ok(found.map(to_json))
    }

    async fn create(&self, collection: &str, document: Document) -> Result<Document, StoreError> {
        let mut document = to_bson(&document)?;
        document.remove("_id");

        let result = self.collection(collection).insert_one(&document).await?;
        document.insert("_id", result.inserted_id);
        Ok(to_json(document))
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        mut changes: Document,
    ) -> Result<Option<Document>, StoreError> {
        let oid = parse_id(id)?;
        changes.remove("_id");
        if changes.is_empty() {
            return self.get(collection, id).await;
        }

        let updated = self
            .collection(collection)
            .find_one_and_update(doc! { "_id": oid }, doc! { "$set": to_bson(&changes)? })
            .return_document(ReturnDocument::After)
            .await?;
        Ok(updated.map(to_json))
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let oid = parse_id(id)?;
        let result = self.collection(collection).delete_one(doc! { "_id": oid }).await?;
        Ok(result.deleted_count > 0)
    }
}
