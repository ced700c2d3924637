//! Pure comparison of two tree snapshots
//!
//! `diff` indexes both snapshots by path and reports only differences. It has
//! no side effects and its correctness does not depend on record ordering in
//! either input; output sets are sorted by path for stable rendering.

use crate::tree::snapshot::TreeSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// A file that appeared or disappeared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    pub hash: String,
}

/// A file present in both snapshots with differing content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileModification {
    pub path: String,
    pub old_hash: String,
    pub new_hash: String,
}

/// A directory that appeared or disappeared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryChange {
    pub path: String,
    pub hash: String,
    pub children: Vec<String>,
}

/// A directory present in both snapshots with a differing hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryModification {
    pub path: String,
    pub old_hash: String,
    pub new_hash: String,
    pub old_children: Vec<String>,
    pub new_children: Vec<String>,
    pub children_added: Vec<String>,
    pub children_removed: Vec<String>,
}

/// File-level differences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDelta {
    pub added: Vec<FileChange>,
    pub removed: Vec<FileChange>,
    pub modified: Vec<FileModification>,
}

/// Directory-level differences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryDelta {
    pub added: Vec<DirectoryChange>,
    pub removed: Vec<DirectoryChange>,
    pub modified: Vec<DirectoryModification>,
}

/// Per-category change counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaSummary {
    pub total_changes: usize,
    pub files_added: usize,
    pub files_removed: usize,
    pub files_modified: usize,
    pub directories_added: usize,
    pub directories_removed: usize,
    pub directories_modified: usize,
}

/// All differences between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeDelta {
    pub root_changed: bool,
    pub old_root_hash: String,
    pub new_root_hash: String,
    pub files: FileDelta,
    pub directories: DirectoryDelta,
    pub summary: DeltaSummary,
}

impl TreeDelta {
    /// True when the snapshots are identical.
    pub fn is_empty(&self) -> bool {
        self.summary.total_changes == 0
    }

    /// Paths introduced or altered by this delta (files and directories).
    ///
    /// Annotation application on incremental updates is restricted to these;
    /// everything else keeps its carried-forward role.
    pub fn touched_paths(&self) -> HashSet<&str> {
        let mut paths = HashSet::new();
        paths.extend(self.files.added.iter().map(|f| f.path.as_str()));
        paths.extend(self.files.modified.iter().map(|f| f.path.as_str()));
        paths.extend(self.directories.added.iter().map(|d| d.path.as_str()));
        paths.extend(self.directories.modified.iter().map(|d| d.path.as_str()));
        paths
    }
}

/// Compare two snapshots into added/removed/modified sets.
pub fn diff(old: &TreeSnapshot, new: &TreeSnapshot) -> TreeDelta {
    let old_files = old.files_by_path();
    let new_files = new.files_by_path();
    let old_dirs = old.directories_by_path();
    let new_dirs = new.directories_by_path();

    let mut files = FileDelta::default();
    let mut directories = DirectoryDelta::default();

    let file_paths: BTreeSet<&str> = old_files.keys().chain(new_files.keys()).copied().collect();
    for path in file_paths {
        match (old_files.get(path), new_files.get(path)) {
            (None, Some(new_file)) => files.added.push(FileChange {
                path: path.to_string(),
                hash: new_file.hash.clone(),
            }),
            (Some(old_file), None) => files.removed.push(FileChange {
                path: path.to_string(),
                hash: old_file.hash.clone(),
            }),
            (Some(old_file), Some(new_file)) if old_file.hash != new_file.hash => {
                files.modified.push(FileModification {
                    path: path.to_string(),
                    old_hash: old_file.hash.clone(),
                    new_hash: new_file.hash.clone(),
                })
            }
            _ => {}
        }
    }

    let dir_paths: BTreeSet<&str> = old_dirs.keys().chain(new_dirs.keys()).copied().collect();
    for path in dir_paths {
        match (old_dirs.get(path), new_dirs.get(path)) {
            (None, Some(new_dir)) => directories.added.push(DirectoryChange {
                path: path.to_string(),
                hash: new_dir.hash.clone(),
                children: new_dir.children.clone(),
            }),
            (Some(old_dir), None) => directories.removed.push(DirectoryChange {
                path: path.to_string(),
                hash: old_dir.hash.clone(),
                children: old_dir.children.clone(),
            }),
            (Some(old_dir), Some(new_dir)) if old_dir.hash != new_dir.hash => {
                let old_set: BTreeSet<&String> = old_dir.children.iter().collect();
                let new_set: BTreeSet<&String> = new_dir.children.iter().collect();
                directories.modified.push(DirectoryModification {
                    path: path.to_string(),
                    old_hash: old_dir.hash.clone(),
                    new_hash: new_dir.hash.clone(),
                    old_children: old_dir.children.clone(),
                    new_children: new_dir.children.clone(),
                    children_added: new_set.difference(&old_set).map(|s| (*s).clone()).collect(),
                    children_removed: old_set.difference(&new_set).map(|s| (*s).clone()).collect(),
                })
            }
            _ => {}
        }
    }

    let summary = DeltaSummary {
        total_changes: files.added.len()
            + files.removed.len()
            + files.modified.len()
            + directories.added.len()
            + directories.removed.len()
            + directories.modified.len(),
        files_added: files.added.len(),
        files_removed: files.removed.len(),
        files_modified: files.modified.len(),
        directories_added: directories.added.len(),
        directories_removed: directories.removed.len(),
        directories_modified: directories.modified.len(),
    };

    TreeDelta {
        root_changed: old.root_hash != new.root_hash,
        old_root_hash: old.root_hash.clone(),
        new_root_hash: new.root_hash.clone(),
        files,
        directories,
        summary,
    }
}
