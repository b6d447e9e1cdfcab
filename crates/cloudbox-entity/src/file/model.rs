//! File entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Metadata for an uploaded file. The bytes live in object storage.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FileRecord {
    /// Unique file identifier.
    pub id: Uuid,
    /// Account that uploaded the file.
    pub owner_id: Uuid,
    /// Original file name.
    pub name: String,
    /// File size in bytes.
    pub size_bytes: i64,
    /// MIME type.
    pub content_type: String,
    /// Object key in the storage backend.
    #[serde(skip_serializing)]
    pub storage_key: String,
    /// Upload timestamp.
    pub uploaded_at: DateTime<Utc>,
}

impl FileRecord {
    /// Whether `account_id` owns this file.
    pub fn is_owned_by(&self, account_id: Uuid) -> bool {
        self.owner_id == account_id
    }
}

/// Data required to record a new upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFile {
    /// Pre-generated file ID.
    pub id: Uuid,
    /// Uploading account.
    pub owner_id: Uuid,
    /// Original file name.
    pub name: String,
    /// File size in bytes.
    pub size_bytes: i64,
    /// MIME type.
    pub content_type: String,
    /// Object key in the storage backend.
    pub storage_key: String,
}
