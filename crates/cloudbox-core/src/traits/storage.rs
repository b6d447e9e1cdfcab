//! Object storage trait for pluggable blob backends.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::result::AppResult;

/// Trait for object storage backends.
///
/// Implementations exist for the local filesystem and S3-compatible
/// services. The trait is defined here in `cloudbox-core` and implemented
/// in `cloudbox-storage`.
#[async_trait]
pub trait ObjectStorage: Send + Sync + std::fmt::Debug + 'static {
    /// Return the provider type name (e.g., "local", "s3").
    fn provider_type(&self) -> &str;

    /// Check whether the provider is healthy and reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Store an object under `key`, replacing any existing object.
    async fn put_object(&self, key: &str, data: Bytes, content_type: &str) -> AppResult<()>;

    /// Remove the object stored under `key`. Missing objects are not an error.
    async fn delete_object(&self, key: &str) -> AppResult<()>;

    /// Produce a time-limited URL that grants read access to `key`.
    ///
    /// The URL must stop working once `ttl` has elapsed.
    async fn presign_get(&self, key: &str, ttl: Duration) -> AppResult<String>;
}
