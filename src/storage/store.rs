//! Object store abstraction and an in-memory implementation.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// An object read from the store with the metadata the response cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Bytes,
    pub content_type: Option<String>,
    pub cache_control: Option<String>,
}

impl StoredObject {
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self {
            body: body.into(),
            ..Default::default()
        }
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn cache_control(mut self, cache_control: impl Into<String>) -> Self {
        self.cache_control = Some(cache_control.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ObjectStoreError {
    #[error("object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },
    #[error("object store request failed: {0}")]
    Transient(String),
}

/// Blob storage backend.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get(&self, bucket: &str, key: &str) -> Result<StoredObject, ObjectStoreError>;
}

/// In-memory object store, keyed by `(bucket, key)`.
///
/// Useful for local development and tests. Records every key requested.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Arc<RwLock<HashMap<(String, String), StoredObject>>>,
    requests: Arc<RwLock<Vec<String>>>,
    unavailable: Arc<RwLock<bool>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put(&self, bucket: impl Into<String>, key: impl Into<String>, object: StoredObject) {
        self.objects
            .write()
            .await
            .insert((bucket.into(), key.into()), object);
    }

    /// Make every subsequent `get` fail with a transient error.
    pub async fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.write().await = unavailable;
    }

    /// Keys requested so far, in order.
    pub async fn requested_keys(&self) -> Vec<String> {
        self.requests.read().await.clone()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<StoredObject, ObjectStoreError> {
        self.requests.write().await.push(key.to_string());

        if *self.unavailable.read().await {
            return Err(ObjectStoreError::Transient("store unavailable".to_string()));
        }

        self.objects
            .read()
            .await
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| ObjectStoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }
}
