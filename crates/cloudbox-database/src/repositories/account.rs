//! Account repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use cloudbox_core::error::{AppError, ErrorKind};
use cloudbox_core::result::AppResult;
use cloudbox_entity::account::Account;

use super::map_write_error;
use crate::store::AccountStore;

/// PostgreSQL-backed account store.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    pool: PgPool,
}

impl AccountRepository {
    /// Create a new account repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for AccountRepository {
    async fn insert(&self, account: &Account) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO accounts (id, username, email, password_hash, failed_login_attempts, \
             locked_until, last_login_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(account.id)
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(account.failed_login_attempts)
        .bind(account.locked_until)
        .bind(account.last_login_at)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error("Failed to create account", e))?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Account>> {
        sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find account by id", e)
            })
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<Account>> {
        sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE LOWER(username) = LOWER($1)")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find account by username", e)
            })
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find account by email", e)
            })
    }

    async fn update(&self, account: &Account) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE accounts SET email = $2, password_hash = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(account.id)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error("Failed to update account", e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!(
                "Account {} not found",
                account.id
            )));
        }
        Ok(())
    }

    async fn record_login_failure(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
        max_attempts: i32,
        lock_until: DateTime<Utc>,
    ) -> AppResult<Option<Account>> {
        // Right-hand sides see the pre-update row; a non-null
        // locked_until here is always a lapsed lock.
        sqlx::query_as::<_, Account>(
            "UPDATE accounts SET \
             failed_login_attempts = CASE WHEN locked_until IS NOT NULL THEN 1 \
                 ELSE failed_login_attempts + 1 END, \
             locked_until = CASE WHEN (CASE WHEN locked_until IS NOT NULL THEN 1 \
                 ELSE failed_login_attempts + 1 END) >= $3 THEN $4 ELSE NULL END, \
             updated_at = $2 \
             WHERE id = $1 AND (locked_until IS NULL OR locked_until <= $2) \
             RETURNING *",
        )
        .bind(id)
        .bind(now)
        .bind(max_attempts)
        .bind(lock_until)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to record failed login", e)
        })
    }

    async fn record_login_success(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Account>> {
        sqlx::query_as::<_, Account>(
            "UPDATE accounts SET failed_login_attempts = 0, locked_until = NULL, \
             last_login_at = $2, updated_at = $2 \
             WHERE id = $1 AND (locked_until IS NULL OR locked_until <= $2) \
             RETURNING *",
        )
        .bind(id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to record successful login", e)
        })
    }
}
