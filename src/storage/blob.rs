//! Blob storage for working-tree archives

use crate::error::SyncError;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Keyed byte storage. Keys are repository ids; values are archive bytes.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes under `key`, overwriting any existing blob.
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), SyncError>;

    /// Fetch the bytes stored under `key`.
    async fn get(&self, key: &str) -> Result<Vec<u8>, SyncError>;

    /// Whether a blob exists under `key`. Advisory only: callers log the
    /// answer but never depend on it for correctness.
    async fn exists(&self, key: &str) -> Result<bool, SyncError>;
}

/// Filesystem-backed blob store rooted at a base directory.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.zip", key))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), SyncError> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| SyncError::StorageFailure(format!("Failed to create blob root: {}", e)))?;
        fs::write(self.blob_path(key), bytes)
            .await
            .map_err(|e| SyncError::StorageFailure(format!("Failed to write blob {}: {}", key, e)))
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, SyncError> {
        fs::read(self.blob_path(key))
            .await
            .map_err(|e| SyncError::StorageFailure(format!("Failed to read blob {}: {}", key, e)))
    }

    async fn exists(&self, key: &str) -> Result<bool, SyncError> {
        Ok(self.blob_path(key).exists())
    }
}

/// In-memory blob store for tests and single-process use.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), SyncError> {
        self.blobs.write().insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, SyncError> {
        self.blobs
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| SyncError::StorageFailure(format!("No blob for key {}", key)))
    }

    async fn exists(&self, key: &str) -> Result<bool, SyncError> {
        Ok(self.blobs.read().contains_key(key))
    }
}
