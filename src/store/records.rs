//! Record store: opaque key/value CRUD over named collections.

use std::collections::BTreeMap;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use super::StoreError;

/// Plain scalar accepted by collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Text(String),
    Number(f64),
    Null,
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<Option<f64>> for Scalar {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Scalar::Null, Scalar::Number)
    }
}

impl From<Option<String>> for Scalar {
    fn from(value: Option<String>) -> Self {
        value.map_or(Scalar::Null, Scalar::Text)
    }
}

impl Scalar {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// A flat record of named scalars.
pub type Record = BTreeMap<String, Scalar>;

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert or replace `id` in `collection`.
    async fn put(&self, collection: &str, id: &str, record: Record) -> Result<(), StoreError>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Record>, StoreError>;

    /// Returns whether a record was removed.
    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError>;

    /// All records in `collection`, ordered by id.
    async fn list(&self, collection: &str) -> Result<Vec<(String, Record)>, StoreError>;
}

/// In-process record store.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    inner: DashMap<(String, String), Record>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn put(&self, collection: &str, id: &str, record: Record) -> Result<(), StoreError> {
        self.inner
            .insert((collection.to_string(), id.to_string()), record);
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Record>, StoreError> {
        Ok(self
            .inner
            .get(&(collection.to_string(), id.to_string()))
            .map(|r| r.value().clone()))
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        Ok(self
            .inner
            .remove(&(collection.to_string(), id.to_string()))
            .is_some())
    }

    async fn list(&self, collection: &str) -> Result<Vec<(String, Record)>, StoreError> {
        let mut rows: Vec<(String, Record)> = self
            .inner
            .iter()
            .filter(|r| r.key().0 == collection)
            .map(|r| (r.key().1.clone(), r.value().clone()))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(rows)
    }
}
