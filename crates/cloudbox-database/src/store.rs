//! Persistence traits consumed by the auth and service layers.
//!
//! Every store reports a uniqueness violation as an [`ErrorKind::Conflict`]
//! error and any backend failure as [`ErrorKind::Database`].
//!
//! [`ErrorKind::Conflict`]: cloudbox_core::error::ErrorKind::Conflict
//! [`ErrorKind::Database`]: cloudbox_core::error::ErrorKind::Database

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use cloudbox_core::result::AppResult;
use cloudbox_entity::account::Account;
use cloudbox_entity::file::FileRecord;
use cloudbox_entity::share::ShareLink;

use crate::memory::{MemoryAccountStore, MemoryFileStore, MemoryShareLinkStore};
use crate::repositories::{AccountRepository, FileRepository, ShareLinkRepository};

/// Account records keyed by id, username and email.
#[async_trait]
pub trait AccountStore: Send + Sync + std::fmt::Debug + 'static {
    /// Insert a new account. Duplicate username or email is a conflict.
    async fn insert(&self, account: &Account) -> AppResult<()>;

    /// Find an account by primary key.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Account>>;

    /// Find an account by username (case-insensitive).
    async fn find_by_username(&self, username: &str) -> AppResult<Option<Account>>;

    /// Find an account by email (case-insensitive).
    async fn find_by_email(&self, email: &str) -> AppResult<Option<Account>>;

    /// Persist the profile fields of an existing account: email, password
    /// hash and `updated_at`. Lockout state changes only through the
    /// `record_login_*` operations.
    async fn update(&self, account: &Account) -> AppResult<()>;

    /// Atomically count a failed login at `now`.
    ///
    /// The increment applies only if the account is not locked at `now`. A
    /// lapsed lock restarts the count at 1, and reaching `max_attempts` sets
    /// `locked_until = lock_until`. Returns the updated account, or `None` if
    /// the account is missing or locked.
    async fn record_login_failure(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
        max_attempts: i32,
        lock_until: DateTime<Utc>,
    ) -> AppResult<Option<Account>>;

    /// Atomically clear lockout state and stamp `last_login_at = now`.
    ///
    /// Returns `None` if the account is missing or locked at `now`.
    async fn record_login_success(&self, id: Uuid, now: DateTime<Utc>)
    -> AppResult<Option<Account>>;
}

/// Share link records keyed by token.
#[async_trait]
pub trait ShareLinkStore: Send + Sync + std::fmt::Debug + 'static {
    /// Insert a new link. A duplicate token is a conflict.
    async fn insert(&self, link: &ShareLink) -> AppResult<()>;

    /// Find a link by token, active or not.
    async fn find_by_token(&self, token: &str) -> AppResult<Option<ShareLink>>;

    /// All links created by `owner_id`, newest first.
    async fn find_by_owner(&self, owner_id: Uuid) -> AppResult<Vec<ShareLink>>;

    /// Atomically increment `access_count` if the link grants access at
    /// `now`. Returns the updated link, or `None` if it does not.
    async fn record_access(&self, token: &str, now: DateTime<Utc>) -> AppResult<Option<ShareLink>>;

    /// Clear `is_active`. Returns whether this call changed the link.
    async fn deactivate(&self, token: &str) -> AppResult<bool>;

    /// Deactivate every active link whose expiry is at or before `now`.
    /// Returns the number of links changed.
    async fn deactivate_expired(&self, now: DateTime<Utc>) -> AppResult<u64>;
}

/// File metadata records.
#[async_trait]
pub trait FileStore: Send + Sync + std::fmt::Debug + 'static {
    /// Record a new upload.
    async fn insert(&self, file: &FileRecord) -> AppResult<()>;

    /// Find a file by primary key.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<FileRecord>>;

    /// All files uploaded by `owner_id`, newest first.
    async fn find_by_owner(&self, owner_id: Uuid) -> AppResult<Vec<FileRecord>>;
}

/// The full set of stores, shared across services.
#[derive(Debug, Clone)]
pub struct Stores {
    /// Account store.
    pub accounts: Arc<dyn AccountStore>,
    /// Share link store.
    pub shares: Arc<dyn ShareLinkStore>,
    /// File metadata store.
    pub files: Arc<dyn FileStore>,
}

impl Stores {
    /// PostgreSQL-backed stores sharing one pool.
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            accounts: Arc::new(AccountRepository::new(pool.clone())),
            shares: Arc::new(ShareLinkRepository::new(pool.clone())),
            files: Arc::new(FileRepository::new(pool)),
        }
    }

    /// Process-local stores. State is lost on restart.
    pub fn in_memory() -> Self {
        Self {
            accounts: Arc::new(MemoryAccountStore::new()),
            shares: Arc::new(MemoryShareLinkStore::new()),
            files: Arc::new(MemoryFileStore::new()),
        }
    }
}
