//! Repository state manager
//!
//! Decides, per repository, whether a cached snapshot can be reused or a new
//! one must be computed. A repository id moves through four states: unknown
//! (no record), fresh (stored revision matches the remote), stale (they
//! differ), and a transient updating state while a refresh runs. Role
//! annotations attached to paths survive refreshes: paths untouched by the
//! diff keep their previous role.
//!
//! All collaborators are injected traits, so tests run against in-memory
//! blob/record stores and fixture hosts.

pub mod locks;
pub mod url;

use crate::archive;
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::remote::{self, SourceHost};
use crate::storage::{BlobStore, RecordStore, RepositoryRecord};
use crate::tree::diff::{self, TreeDelta};
use crate::tree::snapshot::TreeSnapshot;
use crate::tree::TreeScanner;
use crate::types::RepoId;
use chrono::Utc;
use locks::RepoLockManager;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Stored-vs-remote freshness of one repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoState {
    /// No persisted record for this id.
    Unknown,
    /// Stored revision matches the remote branch head.
    Fresh,
    /// Stored revision differs from the remote branch head.
    Stale,
}

/// Result of a freshness check.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateCheck {
    pub repo_id: RepoId,
    pub state: RepoState,
    /// Remote branch head; absent when no record exists (nothing to compare).
    pub remote_revision: Option<String>,
}

/// Result of materializing a working copy.
#[derive(Debug, Serialize)]
pub struct Materialized {
    /// Whether a new snapshot was computed.
    pub changed: bool,
    /// Differences against the previous snapshot; absent on the fast path
    /// and on first ingestion.
    pub delta: Option<TreeDelta>,
    pub local_path: PathBuf,
    pub record: RepositoryRecord,
}

/// Result of cloning a source for first-time ingestion.
#[derive(Debug, Clone)]
pub struct ClonedSource {
    pub source_url: String,
    pub repo_id: RepoId,
    pub local_path: PathBuf,
}

/// Kind of record a single-path annotation update landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleTarget {
    File,
    Directory,
}

/// Orchestrates remote-revision checks, working-copy materialization,
/// snapshot persistence, and annotation carry-forward.
pub struct SnapshotStore {
    host: Arc<dyn SourceHost>,
    blobs: Arc<dyn BlobStore>,
    records: Arc<dyn RecordStore>,
    config: SyncConfig,
    locks: RepoLockManager,
}

impl SnapshotStore {
    pub fn new(
        host: Arc<dyn SourceHost>,
        blobs: Arc<dyn BlobStore>,
        records: Arc<dyn RecordStore>,
        config: SyncConfig,
    ) -> Self {
        Self {
            host,
            blobs,
            records,
            config,
            locks: RepoLockManager::new(),
        }
    }

    /// Canonicalize a source URL, derive its repository id, and compare the
    /// stored revision against the remote branch head.
    #[instrument(skip(self))]
    pub async fn check_for_update(&self, source_url: &str) -> Result<UpdateCheck, SyncError> {
        let canonical = url::canonicalize_source_url(source_url)?;
        let repo_id = url::repo_id_for_url(&canonical);

        let Some(record) = self.records.get(&repo_id)? else {
            return Ok(UpdateCheck {
                repo_id,
                state: RepoState::Unknown,
                remote_revision: None,
            });
        };

        let remote_revision = remote::latest_revision_with_fallback(
            self.host.as_ref(),
            &record.source_url,
            &self.config.branch,
            &self.config.fallback_branch,
        )
        .await?;

        let state = if record.latest_revision.as_deref() == Some(remote_revision.as_str()) {
            RepoState::Fresh
        } else {
            RepoState::Stale
        };
        debug!(%repo_id, ?state, "Checked repository freshness");

        Ok(UpdateCheck {
            repo_id,
            state,
            remote_revision: Some(remote_revision),
        })
    }

    /// First-time ingestion in one step: clone, fetch the branch head, then
    /// archive, hash, annotate, and persist via
    /// [`SnapshotStore::upsert_with_annotations`].
    pub async fn ingest(
        &self,
        source_url: &str,
        role_map: &HashMap<PathBuf, String>,
    ) -> Result<Materialized, SyncError> {
        let cloned = self.clone_source(source_url).await?;
        let revision = remote::latest_revision_with_fallback(
            self.host.as_ref(),
            &cloned.source_url,
            &self.config.branch,
            &self.config.fallback_branch,
        )
        .await?;
        let record = self
            .upsert_with_annotations(
                &cloned.source_url,
                &cloned.repo_id,
                &cloned.local_path,
                &revision,
                role_map,
            )
            .await?;
        Ok(Materialized {
            changed: true,
            delta: None,
            local_path: cloned.local_path,
            record,
        })
    }

    /// Clone a source into its working directory for first-time ingestion,
    /// replacing any prior copy.
    pub async fn clone_source(&self, source_url: &str) -> Result<ClonedSource, SyncError> {
        let canonical = url::canonicalize_source_url(source_url)?;
        let repo_id = url::repo_id_for_url(&canonical);
        let local_path = self.config.working_dir(&repo_id);

        prepare_working_dir(&local_path)?;
        remote::clone_with_fallback(
            self.host.as_ref(),
            &canonical,
            &self.config.branch,
            &self.config.fallback_branch,
            &local_path,
        )
        .await?;

        Ok(ClonedSource {
            source_url: canonical,
            repo_id,
            local_path,
        })
    }

    /// Produce a working copy for a known repository.
    ///
    /// Fresh repositories extract the cached archive without recomputing
    /// anything; a failed archive download falls back to a fresh clone.
    /// Stale repositories (or ones without a snapshot) are re-cloned,
    /// re-hashed, diffed against the prior snapshot, re-archived, and
    /// persisted — with roles carried forward for paths outside the delta.
    ///
    /// The whole sequence runs under this repository's update lease; failures
    /// before the final persist leave the stored record untouched.
    #[instrument(skip(self))]
    pub async fn materialize(&self, repo_id: &str) -> Result<Materialized, SyncError> {
        let lease = self.locks.lease(repo_id);
        let _guard = lease.lock().await;

        let record = self
            .records
            .get(repo_id)?
            .ok_or_else(|| SyncError::NotFound(repo_id.to_string()))?;

        let remote_revision = remote::latest_revision_with_fallback(
            self.host.as_ref(),
            &record.source_url,
            &self.config.branch,
            &self.config.fallback_branch,
        )
        .await?;

        let local_path = self.config.working_dir(repo_id);
        let fresh = record.snapshot.is_some()
            && record.latest_revision.as_deref() == Some(remote_revision.as_str());

        if fresh {
            match self.blobs.get(&record.archive_key).await {
                Ok(bytes) => {
                    archive::unpack_into(&bytes, &local_path)?;
                    info!(repo_id, "Materialized from cached archive");
                    return Ok(Materialized {
                        changed: false,
                        delta: None,
                        local_path,
                        record,
                    });
                }
                Err(e) => {
                    warn!(repo_id, error = %e, "Archive download failed, falling back to fresh clone");
                }
            }
        }

        self.refresh(record, remote_revision, local_path).await
    }

    /// Re-clone, re-hash, diff, carry roles forward, re-archive, persist.
    async fn refresh(
        &self,
        mut record: RepositoryRecord,
        remote_revision: String,
        local_path: PathBuf,
    ) -> Result<Materialized, SyncError> {
        prepare_working_dir(&local_path)?;
        remote::clone_with_fallback(
            self.host.as_ref(),
            &record.source_url,
            &self.config.branch,
            &self.config.fallback_branch,
            &local_path,
        )
        .await?;

        let mut snapshot = TreeScanner::new(&local_path)
            .with_chunk_size(self.config.chunk_size)
            .scan()?;

        let delta = record
            .snapshot
            .as_ref()
            .map(|old| diff::diff(old, &snapshot));
        if let (Some(old), Some(delta)) = (record.snapshot.as_ref(), delta.as_ref()) {
            carry_forward_roles(old, &mut snapshot, delta);
            info!(
                repo_id = %record.repo_id,
                total_changes = delta.summary.total_changes,
                "Computed snapshot delta"
            );
        }

        self.upload_archive(&record.archive_key, &local_path).await?;

        record.latest_revision = Some(remote_revision);
        record.snapshot = Some(snapshot);
        record.local_path = Some(local_path.clone());
        record.updated_at = Utc::now();
        self.records.upsert(&record)?;
        info!(repo_id = %record.repo_id, "Repository snapshot updated");

        Ok(Materialized {
            changed: true,
            delta,
            local_path,
            record,
        })
    }

    /// First-time ingestion: archive, hash, apply the supplied role map to
    /// every matching record, and persist (insert-or-replace by repo id).
    #[instrument(skip(self, role_map))]
    pub async fn upsert_with_annotations(
        &self,
        source_url: &str,
        repo_id: &str,
        local_path: &Path,
        remote_revision: &str,
        role_map: &HashMap<PathBuf, String>,
    ) -> Result<RepositoryRecord, SyncError> {
        let canonical = url::canonicalize_source_url(source_url)?;
        let lease = self.locks.lease(repo_id);
        let _guard = lease.lock().await;

        self.upload_archive(repo_id, local_path).await?;

        let mut snapshot = TreeScanner::new(local_path)
            .with_chunk_size(self.config.chunk_size)
            .scan()?;
        let roles = relative_role_map(local_path, role_map);
        let applied = apply_roles_to_snapshot(&mut snapshot, &roles, None);
        debug!(repo_id, applied, "Applied initial annotations");

        let created_at = match self.records.get(repo_id)? {
            Some(existing) => existing.created_at,
            None => Utc::now(),
        };
        let record = RepositoryRecord {
            display_name: url::display_name(&canonical),
            source_url: canonical,
            repo_id: repo_id.to_string(),
            latest_revision: Some(remote_revision.to_string()),
            archive_key: repo_id.to_string(),
            local_path: Some(local_path.to_path_buf()),
            snapshot: Some(snapshot),
            created_at,
            updated_at: Utc::now(),
        };
        self.records.upsert(&record)?;
        info!(repo_id, "Repository record ingested");

        Ok(record)
    }

    /// Apply externally supplied annotations to a record and persist it.
    ///
    /// On incremental updates the delta restricts application to added and
    /// modified paths; everything else keeps its carried-forward role.
    /// Returns the number of records annotated.
    pub fn apply_annotations(
        &self,
        record: &mut RepositoryRecord,
        local_path: &Path,
        role_map: &HashMap<PathBuf, String>,
        delta: Option<&TreeDelta>,
    ) -> Result<usize, SyncError> {
        let snapshot = record.snapshot.as_mut().ok_or_else(|| {
            SyncError::StorageFailure(format!("Record {} has no snapshot", record.repo_id))
        })?;

        let roles = relative_role_map(local_path, role_map);
        let applied = apply_roles_to_snapshot(snapshot, &roles, delta);
        record.updated_at = Utc::now();
        self.records.upsert(record)?;
        info!(repo_id = %record.repo_id, applied, "Annotations applied");

        Ok(applied)
    }

    /// Flatten all non-null roles into absolute-path form for downstream
    /// pipelines.
    pub fn aggregate_roles(
        &self,
        record: &RepositoryRecord,
        local_path: &Path,
    ) -> BTreeMap<PathBuf, String> {
        let mut roles = BTreeMap::new();
        let Some(snapshot) = &record.snapshot else {
            return roles;
        };
        for file in &snapshot.files {
            if let Some(role) = &file.role {
                roles.insert(join_local(local_path, &file.path), role.clone());
            }
        }
        for dir in &snapshot.directories {
            if let Some(role) = &dir.role {
                roles.insert(join_local(local_path, &dir.path), role.clone());
            }
        }
        roles
    }

    /// Point lookup by repository id.
    pub fn get_record(&self, repo_id: &str) -> Result<RepositoryRecord, SyncError> {
        self.records
            .get(repo_id)?
            .ok_or_else(|| SyncError::NotFound(repo_id.to_string()))
    }

    /// Update the hash and role of a single path in a repository's snapshot
    /// and persist the record.
    pub fn set_role(
        &self,
        repo_id: &str,
        path: &str,
        hash: &str,
        role: &str,
    ) -> Result<RoleTarget, SyncError> {
        let mut record = self.get_record(repo_id)?;
        let snapshot = record.snapshot.as_mut().ok_or_else(|| {
            SyncError::StorageFailure(format!("Record {} has no snapshot", repo_id))
        })?;

        let target = if let Some(file) = snapshot.files.iter_mut().find(|f| f.path == path) {
            file.hash = hash.to_string();
            file.role = Some(role.to_string());
            RoleTarget::File
        } else if let Some(dir) = snapshot.directories.iter_mut().find(|d| d.path == path) {
            dir.hash = hash.to_string();
            dir.role = Some(role.to_string());
            RoleTarget::Directory
        } else {
            return Err(SyncError::NotFound(format!(
                "path {} in repository {}",
                path, repo_id
            )));
        };

        record.updated_at = Utc::now();
        self.records.upsert(&record)?;
        Ok(target)
    }

    /// Pack the working tree and upload it, overwriting any prior archive.
    async fn upload_archive(&self, key: &str, dir: &Path) -> Result<(), SyncError> {
        let bytes = archive::pack_dir(dir)?;
        // Existence check is advisory: the answer is logged, never relied on.
        match self.blobs.exists(key).await {
            Ok(overwritten) => debug!(key, overwritten, "Uploading archive"),
            Err(e) => warn!(key, error = %e, "Archive existence check failed"),
        }
        self.blobs.put(key, &bytes).await
    }
}

/// Wipe and re-create the parent of a working directory so clones land in a
/// fresh path.
fn prepare_working_dir(local_path: &Path) -> Result<(), SyncError> {
    if local_path.exists() {
        fs::remove_dir_all(local_path)?;
    }
    if let Some(parent) = local_path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Convert an external role map (keyed by absolute path under the working
/// copy) into repo-relative POSIX form. Keys already relative are used
/// as-is; keys outside the working copy are dropped.
fn relative_role_map(
    local_path: &Path,
    role_map: &HashMap<PathBuf, String>,
) -> HashMap<String, String> {
    role_map
        .iter()
        .filter_map(|(path, role)| {
            let rel = if path.is_absolute() {
                path.strip_prefix(local_path).ok()?.to_path_buf()
            } else {
                path.clone()
            };
            let key = if rel.as_os_str().is_empty() {
                ".".to_string()
            } else {
                rel.components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/")
            };
            Some((key, role.clone()))
        })
        .collect()
}

/// Apply a relative role map to a snapshot. With a delta, only added and
/// modified paths accept new roles. Returns the number of records updated.
fn apply_roles_to_snapshot(
    snapshot: &mut TreeSnapshot,
    roles: &HashMap<String, String>,
    delta: Option<&TreeDelta>,
) -> usize {
    let touched = delta.map(|d| d.touched_paths());
    let in_scope = |path: &str| touched.as_ref().map_or(true, |t| t.contains(path));

    let mut applied = 0;
    for file in &mut snapshot.files {
        if let Some(role) = roles.get(&file.path) {
            if in_scope(&file.path) {
                file.role = Some(role.clone());
                applied += 1;
            }
        }
    }
    for dir in &mut snapshot.directories {
        if let Some(role) = roles.get(&dir.path) {
            if in_scope(&dir.path) {
                dir.role = Some(role.clone());
                applied += 1;
            }
        }
    }
    applied
}

/// Copy roles from the previous snapshot onto every path the delta did not
/// add or modify.
fn carry_forward_roles(old: &TreeSnapshot, new: &mut TreeSnapshot, delta: &TreeDelta) {
    let touched = delta.touched_paths();
    let old_files = old.files_by_path();
    let old_dirs = old.directories_by_path();

    for file in &mut new.files {
        if !touched.contains(file.path.as_str()) {
            if let Some(prev) = old_files.get(file.path.as_str()) {
                file.role = prev.role.clone();
            }
        }
    }
    for dir in &mut new.directories {
        if !touched.contains(dir.path.as_str()) {
            if let Some(prev) = old_dirs.get(dir.path.as_str()) {
                dir.role = prev.role.clone();
            }
        }
    }
}

/// Resolve a repo-relative record path against the working copy.
fn join_local(local_path: &Path, rel: &str) -> PathBuf {
    if rel == "." {
        local_path.to_path_buf()
    } else {
        local_path.join(rel)
    }
}
