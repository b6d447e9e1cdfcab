//! Object storage construction from configuration.

use std::sync::Arc;

use tracing::info;

use cloudbox_core::config::StorageConfig;
use cloudbox_core::error::AppError;
use cloudbox_core::result::AppResult;
use cloudbox_core::traits::storage::ObjectStorage;
use cloudbox_core::types::Clock;

use crate::providers::LocalObjectStorage;

/// The configured object storage, plus the concrete local provider when one
/// is in use so the HTTP layer can serve its signed `/blobs` URLs.
#[derive(Debug, Clone)]
pub struct StorageHandles {
    /// Provider used by the services.
    pub object_storage: Arc<dyn ObjectStorage>,
    /// Set when the provider is the local filesystem.
    pub local: Option<Arc<LocalObjectStorage>>,
}

impl StorageHandles {
    /// Wrap a local provider.
    pub fn local(storage: LocalObjectStorage) -> Self {
        let storage = Arc::new(storage);
        Self {
            object_storage: storage.clone(),
            local: Some(storage),
        }
    }
}

/// Build the provider named by `config.provider`.
///
/// `fallback_secret` signs local download URLs when no dedicated signing
/// secret is configured.
pub async fn build_object_storage(
    config: &StorageConfig,
    fallback_secret: &str,
    clock: Arc<dyn Clock>,
) -> AppResult<StorageHandles> {
    let handles = match config.provider.as_str() {
        "local" => {
            let secret = if config.local.signing_secret.is_empty() {
                fallback_secret
            } else {
                config.local.signing_secret.as_str()
            };
            let storage = LocalObjectStorage::new(
                &config.local.root_path,
                &config.local.public_base_url,
                secret,
                clock,
            )
            .await?;
            StorageHandles::local(storage)
        }
        #[cfg(feature = "s3")]
        "s3" => {
            let storage = crate::providers::S3ObjectStorage::new(&config.s3).await?;
            StorageHandles {
                object_storage: Arc::new(storage),
                local: None,
            }
        }
        #[cfg(not(feature = "s3"))]
        "s3" => {
            return Err(AppError::configuration(
                "S3 storage requested but the `s3` feature is not enabled",
            ));
        }
        other => {
            return Err(AppError::configuration(format!(
                "Unknown storage provider '{other}'"
            )));
        }
    };

    info!(
        provider = handles.object_storage.provider_type(),
        "Object storage ready"
    );
    Ok(handles)
}

#[cfg(test)]
mod tests {
    use cloudbox_core::error::ErrorKind;
    use cloudbox_core::types::SystemClock;

    use super::*;

    #[tokio::test]
    async fn test_builds_local_provider() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = StorageConfig::default();
        config.local.root_path = dir.path().to_str().unwrap().to_string();

        let handles = build_object_storage(&config, "secret", Arc::new(SystemClock))
            .await
            .unwrap();
        assert_eq!(handles.object_storage.provider_type(), "local");
        assert!(handles.local.is_some());
        assert!(handles.object_storage.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_provider_is_configuration_error() {
        let mut config = StorageConfig::default();
        config.provider = "ftp".into();

        let err = build_object_storage(&config, "secret", Arc::new(SystemClock))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }
}
