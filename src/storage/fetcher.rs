//! Serves a stored object onto the response.

use crate::http::{ResponseError, ResponseWriter};
use crate::storage::store::{ObjectStore, ObjectStoreError};
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of trying to serve one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Metadata and body were written to the response.
    Served,
    NotFound,
    TransientError(String),
}

impl FetchOutcome {
    pub fn is_served(&self) -> bool {
        matches!(self, FetchOutcome::Served)
    }
}

/// Reads `prefix + file` from a single bucket.
#[derive(Clone)]
pub struct StorageFetcher {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl StorageFetcher {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Copy the object's `Content-Type`/`Cache-Control` (when present) and body
    /// onto `res`. The response is not ended.
    ///
    /// Store failures come back as an outcome; only writing to an already
    /// ended response is an error.
    pub async fn fetch(
        &self,
        res: &mut ResponseWriter,
        file: &str,
        prefix: &str,
    ) -> Result<FetchOutcome, ResponseError> {
        let key = format!("{prefix}{file}");

        let object = match self.store.get(&self.bucket, &key).await {
            Ok(object) => object,
            Err(ObjectStoreError::NotFound { .. }) => {
                debug!(bucket = %self.bucket, key = %key, "Object not found");
                return Ok(FetchOutcome::NotFound);
            }
            Err(ObjectStoreError::Transient(message)) => {
                warn!(bucket = %self.bucket, key = %key, error = %message, "Object fetch failed");
                return Ok(FetchOutcome::TransientError(message));
            }
        };

        if let Some(content_type) = object.content_type {
            res.set_header("Content-Type", content_type);
        }
        if let Some(cache_control) = object.cache_control {
            res.set_header("Cache-Control", cache_control);
        }
        res.write(&object.body)?;

        debug!(bucket = %self.bucket, key = %key, bytes = object.body.len(), "Served object");
        Ok(FetchOutcome::Served)
    }
}
