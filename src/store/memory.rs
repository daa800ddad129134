// src/store/memory.rs

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use super::{DocumentStore, Filter, StoreError, unique_value, with_id};

/// Process-local store used in development mode and by the test suites.
///
/// Collections keep documents in insertion order. `fail_next` makes the next
/// `n` calls (of any kind) report [`StoreError::Unavailable`], which lets tests
/// exercise retry paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Value>>>,
    outages: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self, calls: usize) {
        self.outages.store(calls, Ordering::SeqCst);
    }

    fn check_outage(&self) -> Result<(), StoreError> {
        let tripped = self
            .outages
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if tripped {
            return Err(StoreError::Unavailable("simulated outage".to_string()));
        }
        Ok(())
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("memory store lock poisoned".to_string())
}

fn document_id(document: &Value) -> Option<&str> {
    document.get("id").and_then(Value::as_str)
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Value, StoreError> {
        self.check_outage()?;
        let collections = self.collections.read().map_err(poisoned)?;
        collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|doc| document_id(doc) == Some(id)))
            .cloned()
            .ok_or_else(|| StoreError::not_found(collection, id))
    }

    async fn list(
        &self,
        collection: &str,
        filter: Option<&Filter>,
    ) -> Result<Vec<Value>, StoreError> {
        self.check_outage()?;
        let collections = self.collections.read().map_err(poisoned)?;
        let docs = collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| filter.is_none_or(|f| f.matches(doc)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(docs)
    }

    async fn create(&self, collection: &str, data: Value) -> Result<String, StoreError> {
        self.check_outage()?;
        let id = Uuid::new_v4().to_string();
        let document = with_id(data, &id)?;
        let mut collections = self.collections.write().map_err(poisoned)?;
        collections
            .entry(collection.to_string())
            .or_default()
            .push(document);
        Ok(id)
    }

    async fn create_unique(
        &self,
        collection: &str,
        key: &str,
        data: Value,
    ) -> Result<String, StoreError> {
        self.check_outage()?;
        let id = Uuid::new_v4().to_string();
        let document = with_id(data, &id)?;
        let value = unique_value(&document, key)?;

        let mut collections = self.collections.write().map_err(poisoned)?;
        let docs = collections.entry(collection.to_string()).or_default();
        if docs.iter().any(|doc| doc.get(key) == Some(value)) {
            return Err(StoreError::Conflict(format!(
                "{} with this {} already exists",
                collection, key
            )));
        }
        docs.push(document);
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &str, data: Value) -> Result<(), StoreError> {
        self.check_outage()?;
        let document = with_id(data, id)?;
        let mut collections = self.collections.write().map_err(poisoned)?;
        let slot = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|doc| document_id(doc) == Some(id)))
            .ok_or_else(|| StoreError::not_found(collection, id))?;
        *slot = document;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.check_outage()?;
        let mut collections = self.collections.write().map_err(poisoned)?;
        let docs = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::not_found(collection, id))?;
        let before = docs.len();
        docs.retain(|doc| document_id(doc) != Some(id));
        if docs.len() == before {
            return Err(StoreError::not_found(collection, id));
        }
        Ok(())
    }
}
