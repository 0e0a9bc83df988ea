//! S3-backed object store with a lazily constructed client.

use crate::storage::store::{ObjectStore, ObjectStoreError, StoredObject};
use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::Client;
use tokio::sync::OnceCell;
use tracing::debug;

/// Attempts per `GetObject`, including the first.
pub const MAX_ATTEMPTS: u32 = 3;

/// The SDK client is only built the first time an object is requested, so
/// invocations that never touch S3 do not pay for credential and region
/// resolution.
pub struct S3ObjectStore {
    region: Option<String>,
    client: OnceCell<Client>,
}

impl S3ObjectStore {
    /// An empty region defers to the SDK's default region chain.
    pub fn new(region: impl Into<String>) -> Self {
        let region = region.into();
        Self {
            region: (!region.is_empty()).then_some(region),
            client: OnceCell::new(),
        }
    }

    /// Wrap an already configured client.
    pub fn with_client(client: Client) -> Self {
        Self {
            region: None,
            client: OnceCell::new_with(Some(client)),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.client.initialized()
    }

    async fn client(&self) -> &Client {
        self.client
            .get_or_init(|| async {
                debug!(region = ?self.region, "Initializing S3 client");
                let mut loader = aws_config::defaults(BehaviorVersion::latest())
                    .retry_config(RetryConfig::standard().with_max_attempts(MAX_ATTEMPTS));
                if let Some(region) = &self.region {
                    loader = loader.region(Region::new(region.clone()));
                }
                Client::new(&loader.load().await)
            })
            .await
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<StoredObject, ObjectStoreError> {
        let output = match self
            .client()
            .await
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => output,
            Err(err) => {
                if err
                    .as_service_error()
                    .is_some_and(|service| service.is_no_such_key())
                {
                    return Err(ObjectStoreError::NotFound {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                    });
                }
                return Err(ObjectStoreError::Transient(
                    DisplayErrorContext(&err).to_string(),
                ));
            }
        };

        let content_type = output.content_type().map(str::to_string);
        let cache_control = output.cache_control().map(str::to_string);
        let body = output
            .body
            .collect()
            .await
            .map_err(|e| ObjectStoreError::Transient(e.to_string()))?
            .into_bytes();

        Ok(StoredObject {
            body,
            content_type,
            cache_control,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_is_lazy() {
        let store = S3ObjectStore::new("eu-west-1");
        assert!(!store.is_initialized());
        assert_eq!(store.region.as_deref(), Some("eu-west-1"));
    }

    #[test]
    fn test_empty_region_uses_default_chain() {
        let store = S3ObjectStore::new("");
        assert!(store.region.is_none());
    }
}
