//! # Object Storage
//!
//! Keyed byte-blob store behind a trait seam. The orchestrator only needs
//! head/get/put/copy/delete/list-by-prefix; "move" is copy plus delete,
//! which also makes redelivery of an already-moved source fail closed on
//! the existence check instead of reprocessing.

pub mod s3;

use async_trait::async_trait;
use thiserror::Error;

pub use s3::S3ObjectStore;

/// Object store failure. Always technical: connectivity and service
/// errors are retryable by policy.
#[derive(Error, Debug)]
#[error("Object store {operation} failed for s3://{bucket}/{key}: {message}")]
pub struct StorageError {
    pub operation: String,
    pub bucket: String,
    pub key: String,
    pub message: String,
}

impl StorageError {
    pub fn new(
        operation: impl Into<String>,
        bucket: impl Into<String>,
        key: impl Into<String>,
        message: impl ToString,
    ) -> Self {
        Self {
            operation: operation.into(),
            bucket: bucket.into(),
            key: key.into(),
            message: message.to_string(),
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Keyed blob store contract.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool>;

    async fn get(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>>;

    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> StorageResult<()>;

    async fn copy(&self, bucket: &str, src_key: &str, dst_key: &str) -> StorageResult<()>;

    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()>;

    async fn list_by_prefix(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<String>>;

    /// Copy then delete. Not atomic; a crash between the two leaves both
    /// objects, which the existence checks tolerate.
    async fn move_object(&self, bucket: &str, src_key: &str, dst_key: &str) -> StorageResult<()> {
        self.copy(bucket, src_key, dst_key).await?;
        self.delete(bucket, src_key).await
    }
}
