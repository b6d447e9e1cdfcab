//! Share link repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use cloudbox_core::error::{AppError, ErrorKind};
use cloudbox_core::result::AppResult;
use cloudbox_entity::share::ShareLink;

use super::map_write_error;
use crate::store::ShareLinkStore;

/// PostgreSQL-backed share link store.
#[derive(Debug, Clone)]
pub struct ShareLinkRepository {
    pool: PgPool,
}

impl ShareLinkRepository {
    /// Create a new share link repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ShareLinkStore for ShareLinkRepository {
    async fn insert(&self, link: &ShareLink) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO share_links (id, token, file_id, owner_id, created_at, expires_at, \
             is_active, access_count) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(link.id)
        .bind(&link.token)
        .bind(link.file_id)
        .bind(link.owner_id)
        .bind(link.created_at)
        .bind(link.expires_at)
        .bind(link.is_active)
        .bind(link.access_count)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error("Failed to create share link", e))?;
        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> AppResult<Option<ShareLink>> {
        sqlx::query_as::<_, ShareLink>("SELECT * FROM share_links WHERE token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find share link by token", e)
            })
    }

    async fn find_by_owner(&self, owner_id: Uuid) -> AppResult<Vec<ShareLink>> {
        sqlx::query_as::<_, ShareLink>(
            "SELECT * FROM share_links WHERE owner_id = $1 ORDER BY created_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list share links", e))
    }

    async fn record_access(&self, token: &str, now: DateTime<Utc>) -> AppResult<Option<ShareLink>> {
        sqlx::query_as::<_, ShareLink>(
            "UPDATE share_links SET access_count = access_count + 1 \
             WHERE token = $1 AND is_active = TRUE AND expires_at > $2 \
             RETURNING *",
        )
        .bind(token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to record share access", e)
        })
    }

    async fn deactivate(&self, token: &str) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE share_links SET is_active = FALSE WHERE token = $1 AND is_active = TRUE",
        )
        .bind(token)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to deactivate share link", e)
        })?;
        Ok(result.rows_affected() > 0)
    }

    async fn deactivate_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE share_links SET is_active = FALSE WHERE is_active = TRUE AND expires_at <= $1",
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to deactivate expired links", e)
        })?;
        Ok(result.rows_affected())
    }
}
