//! Error types for the repository snapshot engine.
//!
//! Every failure kind is scoped to one repository operation; nothing in this
//! crate aborts the host process. Callers match on the variant to decide
//! whether to retry, serve a stale cached copy, or report upstream.

use thiserror::Error;

/// Snapshot-engine errors.
#[derive(Debug, Error)]
pub enum SyncError {
    /// No persisted record exists for the given repository id.
    #[error("No repository record for id {0}")]
    NotFound(String),

    /// Remote revision fetch, clone, or other network failure. Retryable.
    #[error("Remote unavailable: {0}")]
    RemoteUnavailable(String),

    /// Blob or record-store I/O failure. Retryable.
    #[error("Storage failure: {0}")]
    StorageFailure(String),

    /// Malformed or unsupported source URL.
    #[error("Invalid source URL: {0}")]
    ValidationFailure(String),

    /// Configuration loading or parsing failure.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Local filesystem I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for SyncError {
    fn from(err: config::ConfigError) -> Self {
        SyncError::Config(err.to_string())
    }
}
