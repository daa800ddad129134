// src/store/mod.rs

//! Document store abstraction.
//!
//! Every record the service persists is a JSON object living in a named
//! collection. Stores assign the identifier on `create` and write it back into
//! the document under the `id` key, so typed records round-trip with their id.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

pub use memory::MemoryStore;
pub use postgres::PgDocumentStore;

pub const USERS: &str = "users";
pub const QUESTIONS: &str = "questions";
pub const EXAMS: &str = "exams";
pub const RESULTS: &str = "results";
pub const MARKING_GUIDES: &str = "marking_guides";

pub type SharedStore = Arc<dyn DocumentStore>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("{collection}/{id} not found")]
    NotFound { collection: String, id: String },

    /// Transient failure; the same call may succeed if retried.
    #[error("document store unavailable: {0}")]
    Unavailable(String),

    #[error("malformed document: {0}")]
    Malformed(String),

    /// A uniqueness constraint rejected the write.
    #[error("{0}")]
    Conflict(String),
}

impl StoreError {
    pub fn not_found(collection: &str, id: &str) -> Self {
        StoreError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Malformed(err.to_string())
    }
}

/// Equality filter on a top-level document field.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, document: &Value) -> bool {
        document.get(&self.field) == Some(&self.value)
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> Result<Value, StoreError>;

    /// Lists a collection in insertion order.
    async fn list(&self, collection: &str, filter: Option<&Filter>)
    -> Result<Vec<Value>, StoreError>;

    /// Stores a new document and returns its freshly assigned id.
    async fn create(&self, collection: &str, data: Value) -> Result<String, StoreError>;

    /// Stores a new document unless one in the collection already carries the
    /// same value under `key`. The check and the insert are atomic.
    async fn create_unique(
        &self,
        collection: &str,
        key: &str,
        data: Value,
    ) -> Result<String, StoreError>;

    /// Replaces an existing document, keeping its id.
    async fn update(&self, collection: &str, id: &str, data: Value) -> Result<(), StoreError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;
}

/// The value `data` holds under `key`, which a unique create requires.
pub(crate) fn unique_value<'a>(data: &'a Value, key: &str) -> Result<&'a Value, StoreError> {
    data.get(key)
        .filter(|v| !v.is_null())
        .ok_or_else(|| StoreError::Malformed(format!("document has no '{}' to keep unique", key)))
}

/// Writes `id` into the document, which must be a JSON object.
pub(crate) fn with_id(mut data: Value, id: &str) -> Result<Value, StoreError> {
    match data.as_object_mut() {
        Some(map) => {
            map.insert("id".to_string(), Value::String(id.to_string()));
            Ok(data)
        }
        None => Err(StoreError::Malformed(
            "documents must be JSON objects".to_string(),
        )),
    }
}

pub async fn get_as<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: &str,
    id: &str,
) -> Result<T, StoreError> {
    let document = store.get(collection, id).await?;
    Ok(serde_json::from_value(document)?)
}

pub async fn list_as<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: &str,
    filter: Option<&Filter>,
) -> Result<Vec<T>, StoreError> {
    store
        .list(collection, filter)
        .await?
        .into_iter()
        .map(|doc| serde_json::from_value(doc).map_err(StoreError::from))
        .collect()
}

pub async fn create_from<T: Serialize>(
    store: &dyn DocumentStore,
    collection: &str,
    record: &T,
) -> Result<String, StoreError> {
    store.create(collection, serde_json::to_value(record)?).await
}

pub async fn create_unique_from<T: Serialize>(
    store: &dyn DocumentStore,
    collection: &str,
    key: &str,
    record: &T,
) -> Result<String, StoreError> {
    store
        .create_unique(collection, key, serde_json::to_value(record)?)
        .await
}

pub async fn update_from<T: Serialize>(
    store: &dyn DocumentStore,
    collection: &str,
    id: &str,
    record: &T,
) -> Result<(), StoreError> {
    store
        .update(collection, id, serde_json::to_value(record)?)
        .await
}
