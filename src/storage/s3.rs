//! S3 implementation of the object store contract.
//!
//! The client is constructed once at process start and shared; an optional
//! endpoint override supports local stacks. Head-object 404s map to
//! `exists == false`, every other service error is a storage failure.

use super::{ObjectStore, StorageError, StorageResult};
use crate::config::StorageConfig;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{config::Region, error::SdkError, primitives::ByteStream, Client};
use tracing::{debug, instrument};

#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    /// Build the client from the ambient AWS environment plus the
    /// configured region/endpoint overrides.
    pub async fn new(config: &StorageConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));
        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        debug!(region = %config.region, "S3 object store initialized");
        Self {
            client: Client::new(&sdk_config),
        }
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    #[instrument(skip(self))]
    async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        match self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(SdkError::ServiceError(err)) if err.err().is_not_found() => Ok(false),
            Err(e) => Err(StorageError::new("head", bucket, key, e)),
        }
    }

    #[instrument(skip(self))]
    async fn get(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::new("get", bucket, key, e))?;

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::new("get", bucket, key, e))?;
        Ok(bytes.into_bytes().to_vec())
    }

    #[instrument(skip(self, bytes))]
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> StorageResult<()> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| StorageError::new("put", bucket, key, e))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn copy(&self, bucket: &str, src_key: &str, dst_key: &str) -> StorageResult<()> {
        self.client
            .copy_object()
            .bucket(bucket)
            .copy_source(format!("{bucket}/{src_key}"))
            .key(dst_key)
            .send()
            .await
            .map_err(|e| StorageError::new("copy", bucket, src_key, e))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::new("delete", bucket, key, e))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_by_prefix(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .prefix(prefix);
            if let Some(token) = &continuation {
                request = request.continuation_token(token);
            }

            let output = request
                .send()
                .await
                .map_err(|e| StorageError::new("list", bucket, prefix, e))?;

            for object in output.contents() {
                if let Some(key) = object.key() {
                    keys.push(key.to_string());
                }
            }

            match output.next_continuation_token() {
                Some(token) => continuation = Some(token.to_string()),
                None => break,
            }
        }

        Ok(keys)
    }
}
