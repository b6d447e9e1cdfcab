//! S3-compatible object storage provider (requires the `s3` feature).

use std::time::Duration;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::{debug, info};

use cloudbox_core::config::S3StorageConfig;
use cloudbox_core::error::AppError;
use cloudbox_core::result::AppResult;
use cloudbox_core::traits::storage::ObjectStorage;

/// S3-compatible storage provider.
#[derive(Debug, Clone)]
pub struct S3ObjectStorage {
    /// SDK client bound to the configured region and endpoint.
    client: Client,
    /// Target bucket.
    bucket: String,
}

impl S3ObjectStorage {
    /// Build a client from configuration.
    ///
    /// Static credentials are used when an access key is configured,
    /// otherwise the default AWS credential chain applies.
    pub async fn new(config: &S3StorageConfig) -> AppResult<Self> {
        if config.bucket.is_empty() {
            return Err(AppError::configuration("storage.s3.bucket must be set"));
        }

        info!(
            endpoint = %config.endpoint,
            region = %config.region,
            bucket = %config.bucket,
            "Initializing S3 object storage"
        );

        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));
        if !config.access_key.is_empty() {
            loader = loader.credentials_provider(Credentials::new(
                config.access_key.clone(),
                config.secret_key.clone(),
                None,
                None,
                "cloudbox-config",
            ));
        }
        let shared = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if !config.endpoint.is_empty() {
            builder = builder
                .endpoint_url(config.endpoint.clone())
                .force_path_style(true);
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
            bucket: config.bucket.clone(),
        })
    }
}

#[async_trait]
impl ObjectStorage for S3ObjectStorage {
    fn provider_type(&self) -> &str {
        "s3"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(self
            .client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .is_ok())
    }

    async fn put_object(&self, key: &str, data: Bytes, content_type: &str) -> AppResult<()> {
        let len = data.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| {
                AppError::storage(format!(
                    "Failed to upload object {key}: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        debug!(key, bytes = len, "Uploaded object to S3");
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> AppResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                AppError::storage(format!(
                    "Failed to delete object {key}: {}",
                    DisplayErrorContext(&e)
                ))
            })?;
        Ok(())
    }

    async fn presign_get(&self, key: &str, ttl: Duration) -> AppResult<String> {
        let presigning = PresigningConfig::expires_in(ttl)
            .map_err(|e| AppError::storage(format!("Invalid presign TTL: {e}")))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| {
                AppError::storage(format!(
                    "Failed to presign object {key}: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        Ok(request.uri().to_string())
    }
}
