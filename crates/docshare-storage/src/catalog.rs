//! File metadata.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use docshare_core::{FileId, FileRecord, NewFile, Timestamp};
use tracing::debug;

use crate::error::{StorageError, StorageResult};

/// File metadata storage.
#[async_trait]
pub trait FileCatalog: Send + Sync {
    /// Register an uploaded file.
    async fn insert(&self, file: NewFile) -> StorageResult<FileRecord>;

    /// Look up a file by id. `FileId::NONE` never matches.
    async fn get(&self, id: FileId) -> StorageResult<Option<FileRecord>>;

    /// All files, oldest first.
    async fn list(&self) -> StorageResult<Vec<FileRecord>>;
}

#[derive(Debug, Default)]
struct FileTable {
    last_id: u64,
    files: BTreeMap<FileId, FileRecord>,
}

/// In-memory [`FileCatalog`].
#[derive(Debug, Default)]
pub struct MemoryFileCatalog {
    table: RwLock<FileTable>,
}

impl MemoryFileCatalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FileCatalog for MemoryFileCatalog {
    async fn insert(&self, file: NewFile) -> StorageResult<FileRecord> {
        let mut table = self
            .table
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?;

        let next = table
            .last_id
            .checked_add(1)
            .ok_or_else(|| StorageError::Internal("file id space exhausted".into()))?;
        table.last_id = next;

        let record = FileRecord {
            id: FileId(next),
            filename: file.filename,
            filepath: file.filepath,
            uploader_id: file.uploader_id,
            created_at: Timestamp::now(),
        };
        table.files.insert(record.id, record.clone());
        debug!(file_id = %record.id, uploader = %record.uploader_id, "file registered");
        Ok(record)
    }

    async fn get(&self, id: FileId) -> StorageResult<Option<FileRecord>> {
        let table = self
            .table
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        Ok(table.files.get(&id).cloned())
    }

    async fn list(&self) -> StorageResult<Vec<FileRecord>> {
        let table = self
            .table
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        Ok(table.files.values().cloned().collect())
    }
}
