//! Repository record store
//!
//! One persisted record per repository id, replaced wholesale on update.
//! The sled implementation follows the same bincode-over-sled layout as the
//! snapshot engine's other durable state; a point lookup and an upsert by
//! unique key are the only required operations.

use crate::error::SyncError;
use crate::tree::snapshot::TreeSnapshot;
use crate::types::RepoId;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Persisted state of one ingested repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryRecord {
    /// Canonicalized source URL.
    pub source_url: String,
    /// One-way hash of the canonical source URL; unique key.
    pub repo_id: RepoId,
    /// Last URL path segment without the `.git` suffix.
    pub display_name: String,
    /// Revision id the snapshot was taken at.
    pub latest_revision: Option<String>,
    /// Blob-store key of the archived working tree.
    pub archive_key: String,
    /// Local working-copy path from the most recent materialization.
    pub local_path: Option<PathBuf>,
    /// Hash state of the tree at `latest_revision`.
    pub snapshot: Option<TreeSnapshot>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Record store interface: point lookup and full-document upsert by repo id.
pub trait RecordStore: Send + Sync {
    fn get(&self, repo_id: &str) -> Result<Option<RepositoryRecord>, SyncError>;
    fn upsert(&self, record: &RepositoryRecord) -> Result<(), SyncError>;
    fn list_all(&self) -> Result<Vec<RepositoryRecord>, SyncError>;
}

/// Sled-based implementation of [`RecordStore`].
pub struct SledRecordStore {
    db: sled::Db,
}

impl SledRecordStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, SyncError> {
        let db = sled::open(path)
            .map_err(|e| SyncError::StorageFailure(format!("Failed to open record store: {}", e)))?;
        Ok(Self { db })
    }
}

impl RecordStore for SledRecordStore {
    fn get(&self, repo_id: &str) -> Result<Option<RepositoryRecord>, SyncError> {
        let value = self
            .db
            .get(repo_id.as_bytes())
            .map_err(|e| SyncError::StorageFailure(format!("Failed to get record: {}", e)))?;
        match value {
            Some(bytes) => {
                let record = bincode::deserialize(&bytes).map_err(|e| {
                    SyncError::StorageFailure(format!("Failed to deserialize record: {}", e))
                })?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    fn upsert(&self, record: &RepositoryRecord) -> Result<(), SyncError> {
        let bytes = bincode::serialize(record)
            .map_err(|e| SyncError::StorageFailure(format!("Failed to serialize record: {}", e)))?;
        self.db
            .insert(record.repo_id.as_bytes(), bytes)
            .map_err(|e| SyncError::StorageFailure(format!("Failed to upsert record: {}", e)))?;
        self.db
            .flush()
            .map_err(|e| SyncError::StorageFailure(format!("Failed to flush record store: {}", e)))?;
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<RepositoryRecord>, SyncError> {
        let mut records = Vec::new();
        for item in self.db.iter() {
            let (_, value) = item
                .map_err(|e| SyncError::StorageFailure(format!("Failed to iterate store: {}", e)))?;
            let record = bincode::deserialize(&value).map_err(|e| {
                SyncError::StorageFailure(format!("Failed to deserialize record: {}", e))
            })?;
            records.push(record);
        }
        Ok(records)
    }
}

/// In-memory implementation of [`RecordStore`] for tests.
#[derive(Default)]
pub struct MemoryRecordStore {
    records: RwLock<HashMap<String, RepositoryRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryRecordStore {
    fn get(&self, repo_id: &str) -> Result<Option<RepositoryRecord>, SyncError> {
        Ok(self.records.read().get(repo_id).cloned())
    }

    fn upsert(&self, record: &RepositoryRecord) -> Result<(), SyncError> {
        self.records
            .write()
            .insert(record.repo_id.clone(), record.clone());
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<RepositoryRecord>, SyncError> {
        Ok(self.records.read().values().cloned().collect())
    }
}
