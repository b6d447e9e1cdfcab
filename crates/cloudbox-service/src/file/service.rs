//! File service: uploads into object storage and owner-scoped access.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{info, warn};
use uuid::Uuid;

use cloudbox_core::config::StorageConfig;
use cloudbox_core::error::AppError;
use cloudbox_core::result::AppResult;
use cloudbox_core::traits::storage::ObjectStorage;
use cloudbox_core::types::Clock;
use cloudbox_database::store::FileStore;
use cloudbox_entity::file::FileRecord;

/// A presigned download for an owned file.
#[derive(Debug, Clone)]
pub struct FileDownload {
    /// The file.
    pub file: FileRecord,
    /// Time-limited retrieval URL.
    pub download_url: String,
    /// Lifetime of `download_url`.
    pub expires_in: Duration,
}

/// Stores uploads and hands out owner downloads.
#[derive(Debug, Clone)]
pub struct FileService {
    /// File metadata persistence.
    files: Arc<dyn FileStore>,
    /// Blob storage.
    storage: Arc<dyn ObjectStorage>,
    /// Time source for upload timestamps.
    clock: Arc<dyn Clock>,
    /// Largest accepted upload in bytes.
    max_upload_bytes: u64,
    /// Lifetime of download URLs.
    presign_ttl: Duration,
}

impl FileService {
    /// Creates the service.
    pub fn new(
        config: &StorageConfig,
        files: Arc<dyn FileStore>,
        storage: Arc<dyn ObjectStorage>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            files,
            storage,
            clock,
            max_upload_bytes: config.max_upload_size_bytes,
            presign_ttl: Duration::from_secs(config.presign_ttl_seconds),
        }
    }

    /// Largest accepted upload in bytes.
    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    /// Stores `data` under a fresh key and records its metadata.
    ///
    /// When no usable content type is supplied it is guessed from the name.
    pub async fn upload(
        &self,
        owner_id: Uuid,
        file_name: &str,
        content_type: Option<&str>,
        data: Bytes,
    ) -> AppResult<FileRecord> {
        let name = file_name.trim();
        if name.is_empty() {
            return Err(AppError::validation("file name is required"));
        }
        if data.len() as u64 > self.max_upload_bytes {
            return Err(AppError::validation(format!(
                "file too large: maximum size is {} MB",
                self.max_upload_bytes / (1024 * 1024)
            )));
        }

        let content_type = match content_type {
            Some(ct) if !ct.is_empty() && ct != "application/octet-stream" => ct.to_string(),
            _ => mime_guess::from_path(name)
                .first_or_octet_stream()
                .essence_str()
                .to_string(),
        };

        let id = Uuid::new_v4();
        let storage_key = format!("{id}-{}", sanitize_key_part(name));
        let size_bytes = data.len() as i64;

        self.storage
            .put_object(&storage_key, data, &content_type)
            .await?;

        let record = FileRecord {
            id,
            owner_id,
            name: name.to_string(),
            size_bytes,
            content_type,
            storage_key,
            uploaded_at: self.clock.now(),
        };

        if let Err(e) = self.files.insert(&record).await {
            if let Err(cleanup) = self.storage.delete_object(&record.storage_key).await {
                warn!(key = %record.storage_key, error = %cleanup, "Failed to remove orphaned object");
            }
            return Err(e);
        }

        info!(
            file_id = %record.id,
            owner_id = %owner_id,
            size_bytes,
            "File uploaded"
        );
        Ok(record)
    }

    /// Files owned by `owner_id`, newest first.
    pub async fn list(&self, owner_id: Uuid) -> AppResult<Vec<FileRecord>> {
        self.files.find_by_owner(owner_id).await
    }

    /// Loads `file_id` if it belongs to `owner_id`.
    ///
    /// Missing and foreign files produce the same error.
    pub async fn find_owned(&self, file_id: Uuid, owner_id: Uuid) -> AppResult<FileRecord> {
        match self.files.find_by_id(file_id).await? {
            Some(file) if file.is_owned_by(owner_id) => Ok(file),
            _ => Err(AppError::not_found("file not found or access denied")),
        }
    }

    /// Mints a download URL for an owned file.
    pub async fn download_url(&self, file_id: Uuid, owner_id: Uuid) -> AppResult<FileDownload> {
        let file = self.find_owned(file_id, owner_id).await?;
        let download_url = self
            .storage
            .presign_get(&file.storage_key, self.presign_ttl)
            .await?;

        Ok(FileDownload {
            file,
            download_url,
            expires_in: self.presign_ttl,
        })
    }
}

/// Reduce a file name to characters that are safe in an object key.
fn sanitize_key_part(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    match cleaned.trim_matches('.') {
        "" => "file".to_string(),
        trimmed => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use cloudbox_core::error::ErrorKind;
    use cloudbox_core::types::SystemClock;
    use cloudbox_database::memory::MemoryFileStore;

    use super::*;
    use crate::testing::FakeStorage;

    fn service(max: u64) -> (FileService, Arc<FakeStorage>) {
        let storage = Arc::new(FakeStorage::default());
        let config = StorageConfig {
            max_upload_size_bytes: max,
            ..StorageConfig::default()
        };
        (
            FileService::new(
                &config,
                Arc::new(MemoryFileStore::new()),
                storage.clone(),
                Arc::new(SystemClock),
            ),
            storage,
        )
    }

    #[test]
    fn test_sanitize_key_part() {
        assert_eq!(sanitize_key_part("report.pdf"), "report.pdf");
        assert_eq!(sanitize_key_part("my file (1).txt"), "my_file__1_.txt");
        assert_eq!(sanitize_key_part("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_key_part(".."), "file");
    }

    #[tokio::test]
    async fn test_upload_stores_blob_and_record() {
        let (svc, storage) = service(1024);
        let owner = Uuid::new_v4();

        let file = svc
            .upload(owner, "notes.txt", None, Bytes::from("hello"))
            .await
            .unwrap();

        assert_eq!(file.content_type, "text/plain");
        assert_eq!(file.size_bytes, 5);
        assert!(file.storage_key.starts_with(&file.id.to_string()));
        assert!(storage.objects.contains_key(&file.storage_key));
        assert_eq!(svc.list(owner).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_upload_over_limit_is_rejected() {
        let (svc, storage) = service(4);
        let err = svc
            .upload(Uuid::new_v4(), "big.bin", None, Bytes::from("hello"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(storage.objects.is_empty());
    }

    #[tokio::test]
    async fn test_foreign_file_is_hidden() {
        let (svc, _) = service(1024);
        let owner = Uuid::new_v4();
        let file = svc
            .upload(owner, "a.txt", Some("text/plain"), Bytes::from("a"))
            .await
            .unwrap();

        let err = svc.download_url(file.id, Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);

        let download = svc.download_url(file.id, owner).await.unwrap();
        assert_eq!(download.expires_in, Duration::from_secs(900));
        assert!(download.download_url.contains(&file.storage_key));
    }
}
