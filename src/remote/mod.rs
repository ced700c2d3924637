//! Source-control host boundary
//!
//! The snapshot engine only needs two things from the host of a source
//! repository: the latest revision id of a branch, and a working copy. Both
//! sit behind [`SourceHost`] so tests can inject fixture hosts.

pub mod github;

pub use github::GitHubHost;

use crate::error::SyncError;
use async_trait::async_trait;
use std::path::Path;
use tracing::warn;

/// Remote operations against the host of a source repository.
#[async_trait]
pub trait SourceHost: Send + Sync {
    /// Fetch the latest revision id for a branch of the repository at
    /// `source_url`.
    async fn latest_revision(&self, source_url: &str, branch: &str) -> Result<String, SyncError>;

    /// Produce a working copy of a branch at `dest`.
    async fn clone_repo(
        &self,
        source_url: &str,
        branch: &str,
        dest: &Path,
    ) -> Result<(), SyncError>;
}

/// Fetch the latest revision on `branch`, retrying on `fallback` when the
/// primary branch fails (repositories predating the default-branch rename).
pub async fn latest_revision_with_fallback(
    host: &dyn SourceHost,
    source_url: &str,
    branch: &str,
    fallback: &str,
) -> Result<String, SyncError> {
    match host.latest_revision(source_url, branch).await {
        Ok(revision) => Ok(revision),
        Err(primary) => {
            warn!(branch, fallback, error = %primary, "Primary branch lookup failed, trying fallback");
            host.latest_revision(source_url, fallback)
                .await
                .map_err(|e| {
                    SyncError::RemoteUnavailable(format!(
                        "Revision lookup failed on '{}' ({}) and '{}' ({})",
                        branch, primary, fallback, e
                    ))
                })
        }
    }
}

/// Clone `branch`, retrying on `fallback` when the primary branch fails.
pub async fn clone_with_fallback(
    host: &dyn SourceHost,
    source_url: &str,
    branch: &str,
    fallback: &str,
    dest: &Path,
) -> Result<(), SyncError> {
    match host.clone_repo(source_url, branch, dest).await {
        Ok(()) => Ok(()),
        Err(primary) => {
            warn!(branch, fallback, error = %primary, "Primary branch clone failed, trying fallback");
            host.clone_repo(source_url, fallback, dest)
                .await
                .map_err(|e| {
                    SyncError::RemoteUnavailable(format!(
                        "Clone failed on '{}' ({}) and '{}' ({})",
                        branch, primary, fallback, e
                    ))
                })
        }
    }
}
