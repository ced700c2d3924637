//! Per-repository update serialization
//!
//! The fetch→clone→hash→archive→persist sequence for one repository must not
//! interleave with itself; updates to different repositories stay
//! independent. Leases are keyed by repo id and held across await points, so
//! the leases themselves are async mutexes behind a synchronous registry.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of per-repo-id update leases.
#[derive(Default)]
pub struct RepoLockManager {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl RepoLockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the lease for a repository id.
    pub fn lease(&self, repo_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .lock()
            .entry(repo_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}
