//! Object storage: where static pages, data files and public assets live.

pub mod fetcher;
pub mod s3;
pub mod store;

pub use fetcher::{FetchOutcome, StorageFetcher};
pub use s3::S3ObjectStore;
pub use store::{MemoryObjectStore, ObjectStore, ObjectStoreError, StoredObject};
