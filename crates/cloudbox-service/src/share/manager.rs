//! Share link lifecycle.
//!
//! A link grants retrieval iff it is active and `now < expires_at`. Expiry is
//! observed lazily: the first resolution at or after `expires_at` clears
//! `is_active` and persists it. The store increments the access counter only
//! while the link still grants access and never writes `is_active = true`,
//! so a concurrent revoke, sweep or second node cannot be undone. The
//! per-token lock orders resolutions within one process.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use cloudbox_core::config::{ShareConfig, StorageConfig};
use cloudbox_core::error::{AppError, ErrorKind};
use cloudbox_core::traits::storage::ObjectStorage;
use cloudbox_core::types::{Clock, KeyedLocks};
use cloudbox_database::store::{FileStore, ShareLinkStore};
use cloudbox_entity::file::FileRecord;
use cloudbox_entity::share::ShareLink;

use super::link::generate_token;

/// Attempts at finding an unused token before giving up.
const TOKEN_ATTEMPTS: usize = 3;

/// Share link failures.
#[derive(Debug, Error)]
pub enum ShareError {
    /// No link with this token.
    #[error("share link not found")]
    NotFound,
    /// The link was revoked or has already been observed as expired.
    #[error("share link is no longer active")]
    Inactive,
    /// The link expired; it has now been deactivated.
    #[error("share link has expired")]
    Expired,
    /// The requester did not create the link.
    #[error("only the creator of a share link can revoke it")]
    Forbidden,
    /// The file is missing or not owned by the requester.
    #[error("file not found or access denied")]
    FileNotFound,
    /// The requested lifetime exceeds the configured maximum.
    #[error("expires_in must be at most {max} hours")]
    InvalidTtl {
        /// Largest accepted value in hours.
        max: u32,
    },
    /// Collaborator failure.
    #[error(transparent)]
    Internal(#[from] AppError),
}

impl From<ShareError> for AppError {
    fn from(err: ShareError) -> Self {
        match err {
            ShareError::NotFound | ShareError::Inactive | ShareError::Expired => {
                AppError::not_found("invalid or expired share link")
            }
            ShareError::Forbidden => AppError::authorization(err.to_string()),
            ShareError::FileNotFound => AppError::not_found(err.to_string()),
            ShareError::InvalidTtl { .. } => AppError::validation(err.to_string()),
            ShareError::Internal(e) => e,
        }
    }
}

/// A successful public access.
#[derive(Debug, Clone)]
pub struct SharedDownload {
    /// The link after its access counter was incremented.
    pub link: ShareLink,
    /// The shared file.
    pub file: FileRecord,
    /// Presigned retrieval URL.
    pub download_url: String,
    /// Lifetime of `download_url`.
    pub url_expires_in: Duration,
}

/// Issues, resolves and revokes share links.
#[derive(Debug, Clone)]
pub struct ShareLinkManager {
    /// Link persistence.
    shares: Arc<dyn ShareLinkStore>,
    /// File metadata, for ownership checks and resolution.
    files: Arc<dyn FileStore>,
    /// Blob storage for presigned URLs.
    storage: Arc<dyn ObjectStorage>,
    /// Time source.
    clock: Arc<dyn Clock>,
    /// Per-token serialization.
    locks: Arc<KeyedLocks<String>>,
    /// Lifetime given to links created without a TTL.
    non_expiring: chrono::Duration,
    /// Largest accepted TTL in hours.
    max_ttl_hours: u32,
    /// Lifetime of presigned URLs.
    presign_ttl: Duration,
}

impl ShareLinkManager {
    /// Creates the manager.
    pub fn new(
        share_config: &ShareConfig,
        storage_config: &StorageConfig,
        shares: Arc<dyn ShareLinkStore>,
        files: Arc<dyn FileStore>,
        storage: Arc<dyn ObjectStorage>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            shares,
            files,
            storage,
            clock,
            locks: Arc::new(KeyedLocks::new()),
            non_expiring: chrono::Duration::days(365 * i64::from(share_config.non_expiring_years)),
            max_ttl_hours: share_config.max_ttl_hours,
            presign_ttl: Duration::from_secs(storage_config.presign_ttl_seconds),
        }
    }

    /// Creates a link to `file_id` for its owner.
    ///
    /// `None` or `Some(0)` yields a far-future expiry rather than no expiry.
    pub async fn issue(
        &self,
        file_id: Uuid,
        owner_id: Uuid,
        ttl_hours: Option<u32>,
    ) -> Result<ShareLink, ShareError> {
        if let Some(hours) = ttl_hours {
            if hours > self.max_ttl_hours {
                return Err(ShareError::InvalidTtl {
                    max: self.max_ttl_hours,
                });
            }
        }

        match self.files.find_by_id(file_id).await? {
            Some(file) if file.is_owned_by(owner_id) => {}
            _ => return Err(ShareError::FileNotFound),
        }

        let now = self.clock.now();
        let expires_at = self.expiry_for(now, ttl_hours);

        let mut attempt = 0;
        let link = loop {
            attempt += 1;
            let link = ShareLink {
                id: Uuid::new_v4(),
                token: generate_token(),
                file_id,
                owner_id,
                created_at: now,
                expires_at,
                is_active: true,
                access_count: 0,
            };
            match self.shares.insert(&link).await {
                Ok(()) => break link,
                Err(e) if e.kind == ErrorKind::Conflict && attempt < TOKEN_ATTEMPTS => {
                    warn!(attempt, "Share token collision, regenerating");
                }
                Err(e) => return Err(e.into()),
            }
        };

        info!(
            share_id = %link.id,
            file_id = %file_id,
            owner_id = %owner_id,
            expires_at = %link.expires_at,
            "Share link created"
        );
        Ok(link)
    }

    fn expiry_for(&self, now: DateTime<Utc>, ttl_hours: Option<u32>) -> DateTime<Utc> {
        match ttl_hours {
            None | Some(0) => now + self.non_expiring,
            Some(hours) => now + chrono::Duration::hours(i64::from(hours)),
        }
    }

    /// Resolves a token to its link and file, counting the access.
    pub async fn resolve(&self, token: &str) -> Result<(ShareLink, FileRecord), ShareError> {
        let this = self.clone();
        let token = token.to_string();
        let (link, file, _) = tokio::spawn(async move { this.observe(&token, false).await })
            .await
            .map_err(|e| AppError::internal(format!("Share resolution task failed: {e}")))??;
        Ok((link, file))
    }

    /// Resolves a token and mints a presigned URL for the shared file.
    ///
    /// The URL is minted before the access is counted, so a failed mint
    /// leaves the counter untouched.
    pub async fn access(&self, token: &str) -> Result<SharedDownload, ShareError> {
        let this = self.clone();
        let token = token.to_string();
        let (link, file, url) = tokio::spawn(async move { this.observe(&token, true).await })
            .await
            .map_err(|e| AppError::internal(format!("Share access task failed: {e}")))??;

        let download_url =
            url.ok_or_else(|| AppError::internal("Presigned URL missing after access"))?;
        Ok(SharedDownload {
            link,
            file,
            download_url,
            url_expires_in: self.presign_ttl,
        })
    }

    async fn observe(
        &self,
        token: &str,
        presign: bool,
    ) -> Result<(ShareLink, FileRecord, Option<String>), ShareError> {
        let _serialized = self.locks.lock(token.to_string()).await;

        let link = self
            .shares
            .find_by_token(token)
            .await?
            .ok_or(ShareError::NotFound)?;

        if !link.is_active {
            debug!(share_id = %link.id, "Inactive share link requested");
            return Err(ShareError::Inactive);
        }

        let now = self.clock.now();
        if link.is_expired_at(now) {
            self.shares.deactivate(token).await?;
            info!(share_id = %link.id, expires_at = %link.expires_at, "Share link expired");
            return Err(ShareError::Expired);
        }

        let file = self
            .files
            .find_by_id(link.file_id)
            .await?
            .ok_or(ShareError::FileNotFound)?;

        let url = if presign {
            Some(
                self.storage
                    .presign_get(&file.storage_key, self.presign_ttl)
                    .await?,
            )
        } else {
            None
        };

        let Some(link) = self.shares.record_access(token, now).await? else {
            debug!(share_id = %link.id, "Share link deactivated during resolution");
            return Err(ShareError::Inactive);
        };

        info!(
            share_id = %link.id,
            file_id = %file.id,
            access_count = link.access_count,
            "Share link accessed"
        );
        Ok((link, file, url))
    }

    /// Deactivates a link. Only its creator may do so.
    pub async fn revoke(&self, token: &str, requester_id: Uuid) -> Result<(), ShareError> {
        let _serialized = self.locks.lock(token.to_string()).await;

        let link = self
            .shares
            .find_by_token(token)
            .await?
            .ok_or(ShareError::NotFound)?;

        if !link.is_owned_by(requester_id) {
            warn!(share_id = %link.id, requester_id = %requester_id, "Share revoke refused");
            return Err(ShareError::Forbidden);
        }

        self.shares.deactivate(token).await?;

        info!(share_id = %link.id, owner_id = %requester_id, "Share link revoked");
        Ok(())
    }

    /// The owner's links that grant access right now. Nothing is modified.
    pub async fn list_active(&self, owner_id: Uuid) -> Result<Vec<ShareLink>, ShareError> {
        let now = self.clock.now();
        Ok(self
            .shares
            .find_by_owner(owner_id)
            .await?
            .into_iter()
            .filter(|link| link.grants_access_at(now))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use chrono::Duration as ChronoDuration;
    use cloudbox_core::types::ManualClock;
    use cloudbox_database::memory::{MemoryFileStore, MemoryShareLinkStore};

    use super::*;
    use crate::share::ShareSweeper;
    use crate::testing::FakeStorage;

    struct Fixture {
        manager: ShareLinkManager,
        shares: Arc<MemoryShareLinkStore>,
        storage: Arc<FakeStorage>,
        clock: Arc<ManualClock>,
        owner: Uuid,
        file: FileRecord,
    }

    async fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::default());
        let shares = Arc::new(MemoryShareLinkStore::new());
        let files = Arc::new(MemoryFileStore::new());
        let storage = Arc::new(FakeStorage::default());
        let owner = Uuid::new_v4();

        let file = FileRecord {
            id: Uuid::new_v4(),
            owner_id: owner,
            name: "report.pdf".into(),
            size_bytes: 3,
            content_type: "application/pdf".into(),
            storage_key: "k-report.pdf".into(),
            uploaded_at: clock.now(),
        };
        files.insert(&file).await.unwrap();
        storage
            .put_object(&file.storage_key, Bytes::from("pdf"), "application/pdf")
            .await
            .unwrap();

        let manager = ShareLinkManager::new(
            &ShareConfig::default(),
            &StorageConfig::default(),
            shares.clone(),
            files,
            storage.clone(),
            clock.clone(),
        );
        Fixture {
            manager,
            shares,
            storage,
            clock,
            owner,
            file,
        }
    }

    #[tokio::test]
    async fn test_issue_requires_ownership() {
        let fx = fixture().await;
        let err = fx
            .manager
            .issue(fx.file.id, Uuid::new_v4(), Some(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ShareError::FileNotFound));

        let err = fx
            .manager
            .issue(Uuid::new_v4(), fx.owner, Some(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ShareError::FileNotFound));
    }

    #[tokio::test]
    async fn test_zero_ttl_means_far_future() {
        let fx = fixture().await;
        let now = fx.clock.now();
        for ttl in [None, Some(0)] {
            let link = fx.manager.issue(fx.file.id, fx.owner, ttl).await.unwrap();
            assert_eq!(link.expires_at, now + ChronoDuration::days(3650));
        }
    }

    #[tokio::test]
    async fn test_ttl_above_maximum_is_rejected() {
        let fx = fixture().await;
        let err = fx
            .manager
            .issue(fx.file.id, fx.owner, Some(24 * 365 + 1))
            .await
            .unwrap_err();
        assert!(matches!(err, ShareError::InvalidTtl { .. }));
    }

    #[tokio::test]
    async fn test_resolve_until_expiry_boundary() {
        let fx = fixture().await;
        let link = fx.manager.issue(fx.file.id, fx.owner, Some(1)).await.unwrap();

        fx.clock.advance(ChronoDuration::minutes(59));
        let (resolved, file) = fx.manager.resolve(&link.token).await.unwrap();
        assert_eq!(resolved.access_count, 1);
        assert_eq!(file.id, fx.file.id);

        fx.clock.advance(ChronoDuration::minutes(1));
        let err = fx.manager.resolve(&link.token).await.unwrap_err();
        assert!(matches!(err, ShareError::Expired));

        let stored = fx.shares.find_by_token(&link.token).await.unwrap().unwrap();
        assert!(!stored.is_active);
        assert_eq!(stored.access_count, 1);

        let err = fx.manager.resolve(&link.token).await.unwrap_err();
        assert!(matches!(err, ShareError::Inactive));
    }

    #[tokio::test]
    async fn test_unknown_token_is_not_found() {
        let fx = fixture().await;
        let err = fx.manager.resolve("no-such-token").await.unwrap_err();
        assert!(matches!(err, ShareError::NotFound));
        assert_eq!(AppError::from(err).message, "invalid or expired share link");
    }

    #[tokio::test]
    async fn test_access_mints_url_before_counting() {
        let fx = fixture().await;
        let link = fx.manager.issue(fx.file.id, fx.owner, Some(1)).await.unwrap();

        fx.storage.set_fail_presign(true);
        assert!(fx.manager.access(&link.token).await.is_err());
        let stored = fx.shares.find_by_token(&link.token).await.unwrap().unwrap();
        assert_eq!(stored.access_count, 0);

        fx.storage.set_fail_presign(false);
        let download = fx.manager.access(&link.token).await.unwrap();
        assert_eq!(download.link.access_count, 1);
        assert!(download.download_url.contains("k-report.pdf"));
        assert_eq!(download.url_expires_in, Duration::from_secs(900));
    }

    #[tokio::test]
    async fn test_revoke_is_owner_only() {
        let fx = fixture().await;
        let link = fx.manager.issue(fx.file.id, fx.owner, Some(1)).await.unwrap();

        let err = fx
            .manager
            .revoke(&link.token, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, ShareError::Forbidden));
        assert!(fx.manager.resolve(&link.token).await.is_ok());

        fx.manager.revoke(&link.token, fx.owner).await.unwrap();
        let err = fx.manager.resolve(&link.token).await.unwrap_err();
        assert!(matches!(err, ShareError::Inactive));
    }

    #[tokio::test]
    async fn test_list_active_excludes_lapsed_without_mutating() {
        let fx = fixture().await;
        let short = fx.manager.issue(fx.file.id, fx.owner, Some(1)).await.unwrap();
        let long = fx.manager.issue(fx.file.id, fx.owner, Some(48)).await.unwrap();
        let revoked = fx.manager.issue(fx.file.id, fx.owner, Some(48)).await.unwrap();
        fx.manager.revoke(&revoked.token, fx.owner).await.unwrap();

        fx.clock.advance(ChronoDuration::hours(2));
        let active = fx.manager.list_active(fx.owner).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].token, long.token);

        let stored = fx.shares.find_by_token(&short.token).await.unwrap().unwrap();
        assert!(stored.is_active);
    }

    #[tokio::test]
    async fn test_concurrent_access_counts_every_success() {
        let fx = fixture().await;
        let link = fx.manager.issue(fx.file.id, fx.owner, Some(1)).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let manager = fx.manager.clone();
            let token = link.token.clone();
            handles.push(tokio::spawn(async move { manager.access(&token).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = fx.shares.find_by_token(&link.token).await.unwrap().unwrap();
        assert_eq!(stored.access_count, 16);
    }

    #[tokio::test]
    async fn test_sweep_during_access_is_not_undone() {
        let fx = fixture().await;
        let link = fx.manager.issue(fx.file.id, fx.owner, Some(1)).await.unwrap();
        fx.clock.advance(ChronoDuration::minutes(59));

        let gate = fx.storage.gate_presign();
        let manager = fx.manager.clone();
        let token = link.token.clone();
        let access = tokio::spawn(async move { manager.access(&token).await });

        gate.entered.notified().await;
        fx.clock.advance(ChronoDuration::minutes(1));
        let sweeper = ShareSweeper::new(
            fx.shares.clone(),
            fx.clock.clone(),
            Duration::from_secs(60),
        );
        assert_eq!(sweeper.run_once().await.unwrap(), 1);
        gate.release.notify_one();

        let err = access.await.unwrap().unwrap_err();
        assert!(matches!(err, ShareError::Inactive));

        let stored = fx.shares.find_by_token(&link.token).await.unwrap().unwrap();
        assert!(!stored.is_active);
        assert_eq!(stored.access_count, 0);
    }
}
