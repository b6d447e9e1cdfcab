//! In-memory account store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use cloudbox_core::error::AppError;
use cloudbox_core::result::AppResult;
use cloudbox_entity::account::Account;

use crate::store::AccountStore;

/// Account table guarded by a single lock so that the uniqueness check and
/// the insert happen together.
#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    accounts: RwLock<HashMap<Uuid, Account>>,
}

impl MemoryAccountStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored accounts.
    pub async fn len(&self) -> usize {
        self.accounts.read().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.accounts.read().await.is_empty()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn insert(&self, account: &Account) -> AppResult<()> {
        let mut accounts = self.accounts.write().await;
        for existing in accounts.values() {
            if existing.username.eq_ignore_ascii_case(&account.username) {
                return Err(AppError::conflict(
                    "unique constraint 'accounts_username_key' violated",
                ));
            }
            if existing.email.eq_ignore_ascii_case(&account.email) {
                return Err(AppError::conflict(
                    "unique constraint 'accounts_email_key' violated",
                ));
            }
        }
        accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Account>> {
        Ok(self.accounts.read().await.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<Account>> {
        Ok(self
            .accounts
            .read()
            .await
            .values()
            .find(|a| a.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        Ok(self
            .accounts
            .read()
            .await
            .values()
            .find(|a| a.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn update(&self, account: &Account) -> AppResult<()> {
        let mut accounts = self.accounts.write().await;
        let taken = accounts.values().any(|existing| {
            existing.id != account.id && existing.email.eq_ignore_ascii_case(&account.email)
        });
        if taken {
            return Err(AppError::conflict(
                "unique constraint 'accounts_email_key' violated",
            ));
        }
        match accounts.get_mut(&account.id) {
            Some(slot) => {
                slot.email = account.email.clone();
                slot.password_hash = account.password_hash.clone();
                slot.updated_at = account.updated_at;
                Ok(())
            }
            None => Err(AppError::not_found(format!(
                "Account {} not found",
                account.id
            ))),
        }
    }

    async fn record_login_failure(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
        max_attempts: i32,
        lock_until: DateTime<Utc>,
    ) -> AppResult<Option<Account>> {
        let mut accounts = self.accounts.write().await;
        Ok(accounts
            .get_mut(&id)
            .filter(|account| !account.is_locked_at(now))
            .map(|account| {
                account.apply_failed_login(now, max_attempts, lock_until);
                account.clone()
            }))
    }

    async fn record_login_success(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Account>> {
        let mut accounts = self.accounts.write().await;
        Ok(accounts
            .get_mut(&id)
            .filter(|account| !account.is_locked_at(now))
            .map(|account| {
                account.apply_successful_login(now);
                account.clone()
            }))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use cloudbox_core::error::ErrorKind;
    use cloudbox_entity::account::NewAccount;

    use super::*;

    fn account(username: &str, email: &str) -> Account {
        Account::from_new(
            NewAccount {
                username: username.into(),
                email: email.into(),
                password_hash: "hash".into(),
            },
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicates_case_insensitively() {
        let store = MemoryAccountStore::new();
        store
            .insert(&account("alice", "alice@example.com"))
            .await
            .unwrap();

        let err = store
            .insert(&account("ALICE", "other@example.com"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);

        let err = store
            .insert(&account("bob", "Alice@Example.com"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);

        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_failures_are_refused_while_locked() {
        let store = MemoryAccountStore::new();
        let acc = account("alice", "alice@example.com");
        store.insert(&acc).await.unwrap();
        let now = Utc::now();
        let until = now + Duration::minutes(15);

        for expected in 1..=5 {
            let updated = store
                .record_login_failure(acc.id, now, 5, until)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(updated.failed_login_attempts, expected);
        }

        assert!(
            store
                .record_login_failure(acc.id, now, 5, until)
                .await
                .unwrap()
                .is_none()
        );
        assert!(store.record_login_success(acc.id, now).await.unwrap().is_none());
        let stored = store.find_by_id(acc.id).await.unwrap().unwrap();
        assert_eq!(stored.failed_login_attempts, 5);
        assert_eq!(stored.locked_until, Some(until));

        let reset = store
            .record_login_success(acc.id, until)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reset.failed_login_attempts, 0);
        assert_eq!(reset.last_login_at, Some(until));
    }

    #[tokio::test]
    async fn test_concurrent_failures_are_all_counted() {
        let store = std::sync::Arc::new(MemoryAccountStore::new());
        let acc = account("alice", "alice@example.com");
        store.insert(&acc).await.unwrap();
        let now = Utc::now();
        let until = now + Duration::minutes(15);
        let id = acc.id;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.record_login_failure(id, now, 5, until).await
            }));
        }
        let mut counted = 0;
        let mut locked = 0;
        for handle in handles {
            if let Some(updated) = handle.await.unwrap().unwrap() {
                counted += 1;
                if updated.failed_login_attempts == 5 {
                    locked += 1;
                }
            }
        }

        assert_eq!(counted, 5);
        assert_eq!(locked, 1);
    }

    #[tokio::test]
    async fn test_update_leaves_lockout_state_alone() {
        let store = MemoryAccountStore::new();
        let acc = account("alice", "alice@example.com");
        store.insert(&acc).await.unwrap();
        let now = Utc::now();
        store
            .record_login_failure(acc.id, now, 5, now + Duration::minutes(15))
            .await
            .unwrap();

        let mut stale = acc.clone();
        stale.password_hash = "rehashed".into();
        store.update(&stale).await.unwrap();

        let stored = store.find_by_id(acc.id).await.unwrap().unwrap();
        assert_eq!(stored.password_hash, "rehashed");
        assert_eq!(stored.failed_login_attempts, 1);

        let err = store
            .update(&account("ghost", "ghost@example.com"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_unknown_account_is_none() {
        let store = MemoryAccountStore::new();
        let now = Utc::now();
        assert!(
            store
                .record_login_failure(Uuid::new_v4(), now, 5, now)
                .await
                .unwrap()
                .is_none()
        );
    }
}
