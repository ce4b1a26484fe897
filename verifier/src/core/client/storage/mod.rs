pub mod error;
pub mod s3;

use async_trait::async_trait;
use bytes::Bytes;
pub use error::StorageError;

/// Trait defining object storage operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Get the data stored under `key`
    async fn get_data(&self, key: &str) -> Result<Bytes, StorageError>;

    /// Store `data` under `key` and return the resulting location
    async fn put_data(&self, data: Bytes, key: &str) -> Result<String, StorageError>;

    /// Check that the bucket is reachable
    async fn health_check(&self) -> Result<(), StorageError>;
}
