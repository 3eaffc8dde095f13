//! In-process document store.
//!
//! Selected with a `memory://` database URI. Ids are generated in the same
//! ObjectId shape the MongoDB backend uses, so id validation behaves the same.

use std::collections::BTreeMap;

use async_trait::async_trait;
use dashmap::DashMap;
use mongodb::bson::oid::ObjectId;
use serde_json::Value;

use super::{matches_filter, Document, DocumentStore, StoreError};

/// Thread-safe in-memory collections keyed by collection name.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: DashMap<String, BTreeMap<String, Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn parse_id(id: &str) -> Result<String, StoreError> {
        ObjectId::parse_str(id)
            .map(|oid| oid.to_hex())
            .map_err(|_| StoreError::InvalidId(id.to_string()))
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn list(&self, collection: &str, filter: &Document) -> Result<Vec<Document>, StoreError> {
        Ok(self
            .collections
            .get(collection)
            .map(|docs| {
                docs.values()
                    .filter(|d| matches_filter(d, filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let id = Self::parse_id(id)?;
        Ok(self
            .collections
            .get(collection)
            .and_then(|docs| docs.get(&id).cloned()))
    }

    async fn create(&self, collection: &str, mut document: Document) -> Result<Document, StoreError> {
        let id = ObjectId::new().to_hex();
        document.insert("_id".to_string(), Value::String(id.clone()));

        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id, document.clone());
        Ok(document)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        changes: Document,
    ) -> Result<Option<Document>, StoreError> {
        let id = Self::parse_id(id)?;
        let Some(mut docs) = self.collections.get_mut(collection) else {
            return Ok(None);
        };
        let Some(existing) = docs.get_mut(&id) else {
            return Ok(None);
        };

        for (key, value) in changes {
            if key != "_id" {
                existing.insert(key, value);
            }
        }
        Ok(Some(existing.clone()))
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let id = Self::parse_id(id)?;
        Ok(self
            .collections
            .get_mut(collection)
            .map(|mut docs| docs.remove(&id).is_some())
            .unwrap_or(false))
    }
}
