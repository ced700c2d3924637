//! Configuration
//!
//! Layered configuration: defaults, then an optional TOML file, then
//! `REPOSYNC_*` environment overrides. All durable state lives under
//! `data_root`: working copies in `repos/<repo_id>`, the record store in
//! `records`, archived trees in `blobs`.

use crate::error::SyncError;
use crate::logging::LoggingConfig;
use crate::tree::hasher::DEFAULT_CHUNK_SIZE;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Snapshot-engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Root directory for working copies, records, and blobs.
    #[serde(default = "default_data_root")]
    pub data_root: PathBuf,

    /// Branch checked and cloned first.
    #[serde(default = "default_branch")]
    pub branch: String,

    /// Branch tried when the primary branch fails.
    #[serde(default = "default_fallback_branch")]
    pub fallback_branch: String,

    /// Timeout for remote revision fetches, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Chunk size for file Merkle hashing, in bytes.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_data_root() -> PathBuf {
    ProjectDirs::from("", "", "reposync")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".reposync"))
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_fallback_branch() -> String {
    "master".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            data_root: default_data_root(),
            branch: default_branch(),
            fallback_branch: default_fallback_branch(),
            request_timeout_secs: default_request_timeout_secs(),
            chunk_size: default_chunk_size(),
            logging: LoggingConfig::default(),
        }
    }
}

impl SyncConfig {
    /// Load configuration from an optional file plus environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, SyncError> {
        let mut builder = config::Config::builder();
        builder = match path {
            Some(path) => builder.add_source(config::File::from(path)),
            None => builder.add_source(config::File::with_name("reposync").required(false)),
        };
        builder = builder.add_source(
            config::Environment::with_prefix("REPOSYNC").separator("__"),
        );
        let settings = builder.build()?;
        let config: SyncConfig = settings.try_deserialize()?;
        Ok(config)
    }

    /// Working-copy directory for one repository.
    pub fn working_dir(&self, repo_id: &str) -> PathBuf {
        self.data_root.join("repos").join(repo_id)
    }

    /// Record-store location.
    pub fn records_path(&self) -> PathBuf {
        self.data_root.join("records")
    }

    /// Blob-store location.
    pub fn blobs_path(&self) -> PathBuf {
        self.data_root.join("blobs")
    }

    /// Remote request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
