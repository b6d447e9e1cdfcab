//! Local filesystem object storage provider.
//!
//! Objects are plain files under a root directory. Downloads are granted
//! through URLs of the form `{base}/blobs/{key}?expires={unix}&signature={sig}`
//! where `sig` is an HMAC-SHA256 over the key and expiry, so the URL cannot be
//! forged or extended without the signing secret.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use bytes::Bytes;
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tokio::fs;
use tokio_util::io::ReaderStream;
use tracing::debug;

use cloudbox_core::error::{AppError, ErrorKind};
use cloudbox_core::result::AppResult;
use cloudbox_core::traits::storage::ObjectStorage;
use cloudbox_core::types::Clock;

type HmacSha256 = Hmac<Sha256>;

/// Characters escaped in blob URL paths. Unreserved characters and `/` pass through.
const KEY_PATH: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Local filesystem storage provider with signed download URLs.
#[derive(Debug, Clone)]
pub struct LocalObjectStorage {
    /// Root directory for all stored objects.
    root: PathBuf,
    /// Base URL prepended to `/blobs/...` in presigned URLs.
    public_base_url: String,
    /// HMAC key for download URLs.
    signing_key: Vec<u8>,
    /// Time source for URL expiry.
    clock: Arc<dyn Clock>,
}

impl LocalObjectStorage {
    /// Create a provider rooted at `root_path`, creating the directory if needed.
    pub async fn new(
        root_path: &str,
        public_base_url: &str,
        signing_secret: &str,
        clock: Arc<dyn Clock>,
    ) -> AppResult<Self> {
        if signing_secret.is_empty() {
            return Err(AppError::configuration(
                "Local storage requires a non-empty signing secret",
            ));
        }

        let root = PathBuf::from(root_path);
        fs::create_dir_all(&root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create storage root: {}", root.display()),
                e,
            )
        })?;

        Ok(Self {
            root,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            signing_key: signing_secret.as_bytes().to_vec(),
            clock,
        })
    }

    /// Resolve an object key to a path inside the root.
    ///
    /// Keys must be relative and may not contain `..` or root components.
    fn resolve(&self, key: &str) -> AppResult<PathBuf> {
        let relative = Path::new(key);
        let valid = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !valid {
            return Err(AppError::validation(format!("Invalid object key: {key}")));
        }
        Ok(self.root.join(relative))
    }

    /// Open an object for streaming. Returns the byte stream and its length.
    pub async fn open_object(&self, key: &str) -> AppResult<(ReaderStream<fs::File>, u64)> {
        let path = self.resolve(key)?;
        let file = fs::File::open(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::not_found(format!("Object not found: {key}"))
            } else {
                AppError::with_source(ErrorKind::Storage, format!("Failed to open object: {key}"), e)
            }
        })?;
        let len = file
            .metadata()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Storage, "Failed to stat object", e))?
            .len();
        Ok((ReaderStream::new(file), len))
    }

    /// Check a download URL's expiry and signature for `key`.
    pub fn verify_download(&self, key: &str, expires: i64, signature: &str) -> AppResult<()> {
        if self.clock.now().timestamp() >= expires {
            return Err(AppError::authentication("Download link has expired"));
        }

        let provided = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| AppError::authentication("Invalid download signature"))?;
        let expected = self.sign(key, expires)?;

        if provided.ct_eq(expected.as_slice()).unwrap_u8() == 1 {
            Ok(())
        } else {
            Err(AppError::authentication("Invalid download signature"))
        }
    }

    fn sign(&self, key: &str, expires: i64) -> AppResult<Vec<u8>> {
        let mut mac = HmacSha256::new_from_slice(&self.signing_key)
            .map_err(|_| AppError::internal("Invalid signing key"))?;
        mac.update(key.as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

#[async_trait]
impl ObjectStorage for LocalObjectStorage {
    fn provider_type(&self) -> &str {
        "local"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(fs::metadata(&self.root)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false))
    }

    async fn put_object(&self, key: &str, data: Bytes, content_type: &str) -> AppResult<()> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to create parent directory: {}", parent.display()),
                    e,
                )
            })?;
        }

        fs::write(&path, &data).await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, format!("Failed to write object: {key}"), e)
        })?;

        debug!(key, content_type, bytes = data.len(), "Stored object");
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> AppResult<()> {
        let path = self.resolve(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to delete object: {key}"),
                e,
            )),
        }
    }

    async fn presign_get(&self, key: &str, ttl: Duration) -> AppResult<String> {
        self.resolve(key)?;
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|_| AppError::validation("Presign TTL out of range"))?;
        let expires = (self.clock.now() + ttl).timestamp();
        let signature = URL_SAFE_NO_PAD.encode(self.sign(key, expires)?);

        Ok(format!(
            "{}/blobs/{}?expires={expires}&signature={signature}",
            self.public_base_url,
            utf8_percent_encode(key, KEY_PATH)
        ))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use cloudbox_core::types::ManualClock;

    use super::*;

    async fn provider(dir: &tempfile::TempDir, clock: Arc<ManualClock>) -> LocalObjectStorage {
        LocalObjectStorage::new(
            dir.path().to_str().unwrap(),
            "http://files.test/",
            "signing-secret",
            clock,
        )
        .await
        .unwrap()
    }

    fn query_param<'a>(url: &'a str, name: &str) -> &'a str {
        let query = url.split_once('?').unwrap().1;
        query
            .split('&')
            .find_map(|pair| pair.strip_prefix(&format!("{name}=")))
            .unwrap()
    }

    #[tokio::test]
    async fn test_put_then_open() {
        let dir = tempfile::tempdir().unwrap();
        let storage = provider(&dir, Arc::new(ManualClock::default())).await;

        storage
            .put_object("abc-report.pdf", Bytes::from("hello"), "application/pdf")
            .await
            .unwrap();

        let (_, len) = storage.open_object("abc-report.pdf").await.unwrap();
        assert_eq!(len, 5);

        storage.delete_object("abc-report.pdf").await.unwrap();
        let err = storage.open_object("abc-report.pdf").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_traversal_keys_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = provider(&dir, Arc::new(ManualClock::default())).await;

        for key in ["../escape", "/etc/passwd", "a/../../b", ""] {
            let err = storage
                .put_object(key, Bytes::from("x"), "text/plain")
                .await
                .unwrap_err();
            assert_eq!(err.kind, ErrorKind::Validation, "key {key:?}");
        }
    }

    #[tokio::test]
    async fn test_presigned_url_verifies_until_expiry() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let storage = provider(&dir, clock.clone()).await;

        let url = storage
            .presign_get("abc-my file.txt", Duration::from_secs(900))
            .await
            .unwrap();
        assert!(url.starts_with("http://files.test/blobs/abc-my%20file.txt?"));

        let expires: i64 = query_param(&url, "expires").parse().unwrap();
        let signature = query_param(&url, "signature");

        storage
            .verify_download("abc-my file.txt", expires, signature)
            .unwrap();
        assert!(
            storage
                .verify_download("other.txt", expires, signature)
                .is_err()
        );
        assert!(
            storage
                .verify_download("abc-my file.txt", expires + 60, signature)
                .is_err()
        );

        clock.advance(chrono::Duration::seconds(900));
        let err = storage
            .verify_download("abc-my file.txt", expires, signature)
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authentication);
    }

    #[tokio::test]
    async fn test_presigned_path_keeps_separators_and_escapes_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let storage = provider(&dir, Arc::new(ManualClock::default())).await;

        let url = storage
            .presign_get("owner/r\u{e9}sum\u{e9} #1~v2.pdf", Duration::from_secs(60))
            .await
            .unwrap();
        let path = url.split_once('?').unwrap().0;
        assert_eq!(
            path,
            "http://files.test/blobs/owner/r%C3%A9sum%C3%A9%20%231~v2.pdf"
        );
    }
}
