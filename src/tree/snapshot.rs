//! Snapshot records for a hashed working tree

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A file with its Merkle hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Repo-relative path with POSIX separators.
    pub path: String,
    /// Lowercase hex Merkle root of the file content.
    pub hash: String,
    /// Annotation attached to this path, carried across updates.
    #[serde(default)]
    pub role: Option<String>,
}

/// A directory with its tree hash and immediate children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryRecord {
    /// Repo-relative path; `"."` for the root.
    pub path: String,
    /// Lowercase hex hash of the directory's sorted entry lines.
    pub hash: String,
    /// Sorted names of immediate children.
    #[serde(default)]
    pub children: Vec<String>,
    /// Annotation attached to this path, carried across updates.
    #[serde(default)]
    pub role: Option<String>,
}

/// One consistent point-in-time view of a repository tree.
///
/// Replaced wholesale on every update; paths are unique within a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeSnapshot {
    pub root_hash: String,
    pub total_files: usize,
    pub total_directories: usize,
    #[serde(default)]
    pub files: Vec<FileRecord>,
    #[serde(default)]
    pub directories: Vec<DirectoryRecord>,
}

impl TreeSnapshot {
    /// Index files by path for diffing and annotation lookups.
    pub fn files_by_path(&self) -> HashMap<&str, &FileRecord> {
        self.files.iter().map(|f| (f.path.as_str(), f)).collect()
    }

    /// Index directories by path.
    pub fn directories_by_path(&self) -> HashMap<&str, &DirectoryRecord> {
        self.directories
            .iter()
            .map(|d| (d.path.as_str(), d))
            .collect()
    }
}
