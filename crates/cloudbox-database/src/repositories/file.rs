//! File metadata repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use cloudbox_core::error::{AppError, ErrorKind};
use cloudbox_core::result::AppResult;
use cloudbox_entity::file::FileRecord;

use super::map_write_error;
use crate::store::FileStore;

/// PostgreSQL-backed file metadata store.
#[derive(Debug, Clone)]
pub struct FileRepository {
    pool: PgPool,
}

impl FileRepository {
    /// Create a new file repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FileStore for FileRepository {
    async fn insert(&self, file: &FileRecord) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO files (id, owner_id, name, size_bytes, content_type, storage_key, \
             uploaded_at) VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(file.id)
        .bind(file.owner_id)
        .bind(&file.name)
        .bind(file.size_bytes)
        .bind(&file.content_type)
        .bind(&file.storage_key)
        .bind(file.uploaded_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error("Failed to record file", e))?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<FileRecord>> {
        sqlx::query_as::<_, FileRecord>("SELECT * FROM files WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find file", e))
    }

    async fn find_by_owner(&self, owner_id: Uuid) -> AppResult<Vec<FileRecord>> {
        sqlx::query_as::<_, FileRecord>(
            "SELECT * FROM files WHERE owner_id = $1 ORDER BY uploaded_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list files", e))
    }
}
