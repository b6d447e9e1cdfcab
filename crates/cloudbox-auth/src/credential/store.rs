//! Credential store over the account persistence trait.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use cloudbox_core::error::{AppError, ErrorKind};
use cloudbox_core::types::Clock;
use cloudbox_database::store::AccountStore;
use cloudbox_entity::account::{Account, NewAccount};

use crate::lockout::LockoutGuard;

/// Failures from credential operations.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The username is already registered.
    #[error("username already exists")]
    DuplicateUsername,
    /// The email is already registered.
    #[error("email already exists")]
    DuplicateEmail,
    /// The backing store failed.
    #[error(transparent)]
    Persist(#[from] AppError),
}

impl From<CredentialError> for AppError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::DuplicateUsername | CredentialError::DuplicateEmail => {
                AppError::conflict(err.to_string())
            }
            CredentialError::Persist(inner) => inner,
        }
    }
}

/// Creates, finds and saves accounts and records login outcomes.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    /// Account persistence.
    accounts: Arc<dyn AccountStore>,
    /// Time source for creation timestamps.
    clock: Arc<dyn Clock>,
}

impl CredentialStore {
    /// Create a credential store over `accounts`.
    pub fn new(accounts: Arc<dyn AccountStore>, clock: Arc<dyn Clock>) -> Self {
        Self { accounts, clock }
    }

    /// Create an account with a pre-hashed password.
    ///
    /// Both uniqueness checks run before the insert. A conflict raised by the
    /// store itself (a concurrent registration won the race) is re-classified
    /// by looking the fields up again.
    pub async fn create(
        &self,
        username: &str,
        email: &str,
        password_hash: String,
    ) -> Result<Account, CredentialError> {
        self.ensure_available(username, email).await?;

        let account = Account::from_new(
            NewAccount {
                username: username.to_string(),
                email: email.to_string(),
                password_hash,
            },
            self.clock.now(),
        );

        match self.accounts.insert(&account).await {
            Ok(()) => Ok(account),
            Err(e) if e.kind == ErrorKind::Conflict => {
                self.ensure_available(username, email).await?;
                Err(CredentialError::Persist(e))
            }
            Err(e) => Err(CredentialError::Persist(e)),
        }
    }

    async fn ensure_available(&self, username: &str, email: &str) -> Result<(), CredentialError> {
        if self.accounts.find_by_username(username).await?.is_some() {
            return Err(CredentialError::DuplicateUsername);
        }
        if self.accounts.find_by_email(email).await?.is_some() {
            return Err(CredentialError::DuplicateEmail);
        }
        Ok(())
    }

    /// Find an account by username (case-insensitive).
    pub async fn find_by_username(&self, username: &str) -> Result<Option<Account>, CredentialError> {
        Ok(self.accounts.find_by_username(username).await?)
    }

    /// Find an account by id.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, CredentialError> {
        Ok(self.accounts.find_by_id(id).await?)
    }

    /// Persist the profile fields of `account`.
    pub async fn save(&self, account: &Account) -> Result<(), CredentialError> {
        Ok(self.accounts.update(account).await?)
    }

    /// Count a failed login with the guard's limits, atomically in the store.
    ///
    /// `None` means the account is gone or was locked at `now`.
    pub async fn record_failed_login(
        &self,
        id: Uuid,
        guard: &LockoutGuard,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>, CredentialError> {
        Ok(self
            .accounts
            .record_login_failure(id, now, guard.max_attempts(), guard.lock_expiry(now))
            .await?)
    }

    /// Reset lockout state after a successful login, atomically in the store.
    ///
    /// `None` means the account is gone or was locked at `now`.
    pub async fn record_successful_login(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>, CredentialError> {
        Ok(self.accounts.record_login_success(id, now).await?)
    }
}

#[cfg(test)]
mod tests {
    use cloudbox_core::types::SystemClock;
    use cloudbox_database::memory::MemoryAccountStore;

    use super::*;

    fn store() -> (CredentialStore, Arc<MemoryAccountStore>) {
        let accounts = Arc::new(MemoryAccountStore::new());
        (
            CredentialStore::new(accounts.clone(), Arc::new(SystemClock)),
            accounts,
        )
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let (store, _) = store();
        let account = store
            .create("alice", "alice@example.com", "hash".into())
            .await
            .unwrap();

        assert_eq!(account.failed_login_attempts, 0);
        let found = store.find_by_username("ALICE").await.unwrap().unwrap();
        assert_eq!(found.id, account.id);
        assert!(store.find_by_id(account.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_duplicate_username_creates_nothing() {
        let (store, accounts) = store();
        store
            .create("alice", "alice@example.com", "hash".into())
            .await
            .unwrap();

        let err = store
            .create("alice", "other@example.com", "hash".into())
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialError::DuplicateUsername));
        assert_eq!(accounts.len().await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let (store, _) = store();
        store
            .create("alice", "alice@example.com", "hash".into())
            .await
            .unwrap();

        let err = store
            .create("bob", "alice@example.com", "hash".into())
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialError::DuplicateEmail));
        assert_eq!(AppError::from(err).kind, ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_concurrent_registration_yields_one_account() {
        let (store, accounts) = store();
        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .create("alice", &format!("alice{i}@example.com"), "hash".into())
                    .await
            }));
        }

        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(err) => assert!(matches!(err, CredentialError::DuplicateUsername)),
            }
        }
        assert_eq!(created, 1);
        assert_eq!(accounts.len().await, 1);
    }

    #[tokio::test]
    async fn test_save_persists_profile_fields() {
        let (store, _) = store();
        let mut account = store
            .create("alice", "alice@example.com", "hash".into())
            .await
            .unwrap();

        account.email = "alice@new.example.com".into();
        store.save(&account).await.unwrap();

        let found = store.find_by_id(account.id).await.unwrap().unwrap();
        assert_eq!(found.email, "alice@new.example.com");
    }

    #[tokio::test]
    async fn test_failed_logins_use_guard_limits() {
        let (store, _) = store();
        let account = store
            .create("alice", "alice@example.com", "hash".into())
            .await
            .unwrap();
        let guard = LockoutGuard::with_limits(2, chrono::Duration::minutes(5));
        let now = Utc::now();

        let first = store
            .record_failed_login(account.id, &guard, now)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.locked_until, None);

        let second = store
            .record_failed_login(account.id, &guard, now)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.locked_until, Some(now + chrono::Duration::minutes(5)));

        assert!(
            store
                .record_failed_login(account.id, &guard, now)
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            store
                .record_successful_login(account.id, now)
                .await
                .unwrap()
                .is_none()
        );
    }
}
