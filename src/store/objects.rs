//! Object storage for uploaded media.

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

use super::StoreError;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `body` under a sanitized relative `path`.
    async fn put_object(&self, path: &str, body: Bytes) -> Result<(), StoreError>;
}

/// In-process object store. Constructed only with a storage credential,
/// mirroring hosted buckets that refuse anonymous writes.
#[derive(Debug)]
pub struct MemoryObjectStore {
    bucket: String,
    objects: DashMap<String, Bytes>,
}

impl MemoryObjectStore {
    pub fn new(bucket: impl Into<String>, service_key: &str) -> Result<Self, StoreError> {
        if service_key.trim().is_empty() {
            return Err(StoreError::Rejected("empty storage credential".to_string()));
        }
        Ok(Self {
            bucket: bucket.into(),
            objects: DashMap::new(),
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn get(&self, path: &str) -> Option<Bytes> {
        self.objects.get(path).map(|b| b.value().clone())
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put_object(&self, path: &str, body: Bytes) -> Result<(), StoreError> {
        tracing::debug!(bucket = %self.bucket, path, bytes = body.len(), "Storing object");
        self.objects.insert(path.to_string(), body);
        Ok(())
    }
}
