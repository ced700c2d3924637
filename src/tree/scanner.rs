//! Deterministic directory tree hashing
//!
//! Produces a git-style tree hash: per directory, non-ignored entries are
//! sorted lexicographically and rendered as `blob <name> <hash>` /
//! `tree <name> <hash>` lines whose newline-joined UTF-8 bytes are hashed.
//! Sorting before hash composition makes the root hash independent of
//! traversal order and of the OS directory listing order.

use crate::error::SyncError;
use crate::tree::hasher;
use crate::tree::snapshot::{DirectoryRecord, FileRecord, TreeSnapshot};
use crate::types::to_hex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Entry names dropped during traversal.
pub const DEFAULT_IGNORE: &[&str] = &[
    ".git",
    "node_modules",
    ".venv",
    "__pycache__",
    ".pytest_cache",
    ".DS_Store",
    ".gitignore",
];

/// Scanner for hashing a working tree into a [`TreeSnapshot`].
pub struct TreeScanner {
    root: PathBuf,
    ignore: Vec<String>,
    chunk_size: usize,
}

impl TreeScanner {
    /// Create a scanner for the given root directory with the fixed
    /// default ignore set.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            ignore: DEFAULT_IGNORE.iter().map(|s| (*s).to_string()).collect(),
            chunk_size: hasher::DEFAULT_CHUNK_SIZE,
        }
    }

    /// Override the ignored entry names.
    pub fn with_ignore(mut self, ignore: Vec<String>) -> Self {
        self.ignore = ignore;
        self
    }

    /// Override the file-hashing chunk size.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Hash the tree and collect one record per file and per directory
    /// (root included, recorded as `"."` even when empty).
    #[instrument(skip(self), fields(root = %self.root.display()))]
    pub fn scan(&self) -> Result<TreeSnapshot, SyncError> {
        let start = Instant::now();
        // Resolve the root up front so scans of `.` and of the absolute
        // path hash identically.
        let root = dunce::canonicalize(&self.root)?;

        let (root_hash, mut files, mut directories) = self.scan_dir(&root, ".");

        files.sort_by(|a, b| a.path.cmp(&b.path));
        directories.sort_by(|a, b| a.path.cmp(&b.path));

        let snapshot = TreeSnapshot {
            root_hash: to_hex(&root_hash),
            total_files: files.len(),
            total_directories: directories.len(),
            files,
            directories,
        };

        info!(
            root_hash = %snapshot.root_hash,
            total_files = snapshot.total_files,
            total_directories = snapshot.total_directories,
            duration_ms = start.elapsed().as_millis() as u64,
            "Tree scan completed"
        );

        Ok(snapshot)
    }

    /// Recursively hash one directory, returning its hash plus the file and
    /// directory records found beneath it (its own record included).
    ///
    /// Unreadable directories hash as `hash(b"")` and unreadable files are
    /// skipped: one bad entry must not abort ingestion of a large tree.
    fn scan_dir(&self, dir: &Path, rel: &str) -> (crate::types::Hash, Vec<FileRecord>, Vec<DirectoryRecord>) {
        let mut files = Vec::new();
        let mut directories = Vec::new();

        let mut names: Vec<String> = match fs::read_dir(dir) {
            Ok(entries) => entries
                .filter_map(|entry| entry.ok())
                .filter_map(|entry| entry.file_name().into_string().ok())
                .filter(|name| !self.ignore.iter().any(|i| i == name))
                .collect(),
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "Skipping unreadable directory");
                let empty = hasher::hash_bytes(b"");
                directories.push(DirectoryRecord {
                    path: rel.to_string(),
                    hash: to_hex(&empty),
                    children: Vec::new(),
                    role: None,
                });
                return (empty, files, directories);
            }
        };
        names.sort();

        let mut lines: Vec<String> = Vec::with_capacity(names.len());
        let mut children: Vec<String> = Vec::with_capacity(names.len());

        for name in names {
            let entry_path = dir.join(&name);
            let entry_rel = join_relative(rel, &name);

            if entry_path.is_dir() {
                let (dir_hash, mut child_files, mut child_dirs) =
                    self.scan_dir(&entry_path, &entry_rel);
                lines.push(format!("tree {} {}", name, to_hex(&dir_hash)));
                children.push(name);
                files.append(&mut child_files);
                directories.append(&mut child_dirs);
            } else if entry_path.is_file() {
                match hasher::file_merkle_root(&entry_path, self.chunk_size) {
                    Ok(file_hash) => {
                        lines.push(format!("blob {} {}", name, to_hex(&file_hash)));
                        children.push(name);
                        files.push(FileRecord {
                            path: entry_rel,
                            hash: to_hex(&file_hash),
                            role: None,
                        });
                    }
                    Err(e) => {
                        warn!(path = %entry_path.display(), error = %e, "Skipping unreadable file");
                    }
                }
            }
            // Entries that are neither file nor directory (broken symlinks,
            // sockets) are skipped.
        }

        let dir_hash = hasher::hash_bytes(lines.join("\n").as_bytes());
        debug!(path = rel, entries = children.len(), "Hashed directory");

        directories.push(DirectoryRecord {
            path: rel.to_string(),
            hash: to_hex(&dir_hash),
            children,
            role: None,
        });

        (dir_hash, files, directories)
    }
}

/// Flat convenience view: repo-relative path → hex file hash.
///
/// Used by downstream indexers that only care about file content identity.
pub fn file_hashes(root: &Path) -> Result<BTreeMap<String, String>, SyncError> {
    let snapshot = TreeScanner::new(root).scan()?;
    Ok(snapshot
        .files
        .into_iter()
        .map(|f| (f.path, f.hash))
        .collect())
}

/// Join a repo-relative parent path with an entry name using POSIX
/// separators; the root is spelled `"."` and never prefixes its children.
fn join_relative(rel: &str, name: &str) -> String {
    if rel == "." {
        name.to_string()
    } else {
        format!("{}/{}", rel, name)
    }
}
