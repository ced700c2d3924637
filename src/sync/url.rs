//! Source-URL canonicalization and repository-id derivation
//!
//! The same repository must always map to the same id, so URLs are
//! normalized before hashing: trailing slashes are stripped and the `.git`
//! suffix is enforced. `repo_id` is a one-way hash of the canonical form.

use crate::error::SyncError;
use crate::tree::hasher::hash_bytes;
use crate::types::{to_hex, RepoId};
use reqwest::Url;

/// Normalize a source URL to its canonical form.
pub fn canonicalize_source_url(source_url: &str) -> Result<String, SyncError> {
    let trimmed = source_url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(SyncError::ValidationFailure("empty URL".to_string()));
    }

    let parsed = Url::parse(trimmed)
        .map_err(|e| SyncError::ValidationFailure(format!("{}: {}", source_url, e)))?;
    if parsed.scheme() != "https" && parsed.scheme() != "http" {
        return Err(SyncError::ValidationFailure(format!(
            "{}: unsupported scheme '{}'",
            source_url,
            parsed.scheme()
        )));
    }
    if parsed.host_str().map_or(true, |h| h.is_empty()) {
        return Err(SyncError::ValidationFailure(format!(
            "{}: missing host",
            source_url
        )));
    }
    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();
    if segments.len() < 2 {
        return Err(SyncError::ValidationFailure(format!(
            "{}: expected an owner and repository path",
            source_url
        )));
    }

    if trimmed.ends_with(".git") {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{}.git", trimmed))
    }
}

/// Derive the stable repository id from a canonical source URL.
pub fn repo_id_for_url(canonical_url: &str) -> RepoId {
    to_hex(&hash_bytes(canonical_url.as_bytes()))
}

/// Human-facing repository name: last path segment without `.git`.
pub fn display_name(canonical_url: &str) -> String {
    canonical_url
        .rsplit('/')
        .next()
        .unwrap_or(canonical_url)
        .trim_end_matches(".git")
        .to_string()
}
