//! In-memory file metadata store.

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use cloudbox_core::error::AppError;
use cloudbox_core::result::AppResult;
use cloudbox_entity::file::FileRecord;

use crate::store::FileStore;

/// File records keyed by id.
#[derive(Debug, Default)]
pub struct MemoryFileStore {
    files: DashMap<Uuid, FileRecord>,
}

impl MemoryFileStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn insert(&self, file: &FileRecord) -> AppResult<()> {
        if self.files.contains_key(&file.id) {
            return Err(AppError::conflict(format!("File {} already exists", file.id)));
        }
        self.files.insert(file.id, file.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<FileRecord>> {
        Ok(self.files.get(&id).map(|f| f.value().clone()))
    }

    async fn find_by_owner(&self, owner_id: Uuid) -> AppResult<Vec<FileRecord>> {
        let mut files: Vec<FileRecord> = self
            .files
            .iter()
            .filter(|f| f.owner_id == owner_id)
            .map(|f| f.value().clone())
            .collect();
        files.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(files)
    }
}
