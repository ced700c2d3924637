//! GitHub implementation of the source-host boundary
//!
//! Revision lookups go through the REST API; working copies come from a
//! shallow `git clone` of the requested branch.

use crate::error::SyncError;
use crate::remote::SourceHost;
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::path::Path;
use std::process::Command;
use std::time::Duration;
use tracing::{debug, info};

const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Source host backed by the GitHub REST API and the `git` binary.
pub struct GitHubHost {
    client: Client,
    api_base: String,
}

#[derive(Deserialize)]
struct CommitResponse {
    sha: String,
}

impl GitHubHost {
    /// Build a host client with a bounded request timeout. Timeouts surface
    /// as [`SyncError::RemoteUnavailable`], which callers treat as retryable.
    pub fn new(timeout: Duration) -> Result<Self, SyncError> {
        let client = Client::builder()
            .user_agent(concat!("reposync/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::RemoteUnavailable(format!("Failed to build client: {}", e)))?;
        Ok(Self {
            client,
            api_base: DEFAULT_API_BASE.to_string(),
        })
    }

    /// Point the client at a different API base URL.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Extract `(owner, repo)` from a canonical source URL.
    fn owner_repo(source_url: &str) -> Result<(String, String), SyncError> {
        let url = Url::parse(source_url)
            .map_err(|e| SyncError::ValidationFailure(format!("{}: {}", source_url, e)))?;
        let mut segments = url
            .path_segments()
            .ok_or_else(|| SyncError::ValidationFailure(source_url.to_string()))?;
        let owner = segments
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| SyncError::ValidationFailure(source_url.to_string()))?;
        let repo = segments
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| SyncError::ValidationFailure(source_url.to_string()))?;
        Ok((
            owner.to_string(),
            repo.trim_end_matches(".git").to_string(),
        ))
    }
}

#[async_trait]
impl SourceHost for GitHubHost {
    async fn latest_revision(&self, source_url: &str, branch: &str) -> Result<String, SyncError> {
        let (owner, repo) = Self::owner_repo(source_url)?;
        let api_url = format!(
            "{}/repos/{}/{}/commits/{}",
            self.api_base, owner, repo, branch
        );
        debug!(%api_url, "Fetching latest revision");

        let response = self
            .client
            .get(&api_url)
            .send()
            .await
            .map_err(|e| SyncError::RemoteUnavailable(format!("Revision fetch failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(SyncError::RemoteUnavailable(format!(
                "Revision fetch for {}/{}@{} returned {}",
                owner,
                repo,
                branch,
                response.status()
            )));
        }

        let commit: CommitResponse = response
            .json()
            .await
            .map_err(|e| SyncError::RemoteUnavailable(format!("Malformed revision response: {}", e)))?;
        Ok(commit.sha)
    }

    async fn clone_repo(
        &self,
        source_url: &str,
        branch: &str,
        dest: &Path,
    ) -> Result<(), SyncError> {
        info!(source_url, branch, dest = %dest.display(), "Cloning repository");
        // Shallow clone: only the latest commit on the branch is needed.
        let output = Command::new("git")
            .arg("clone")
            .arg("--depth")
            .arg("1")
            .arg("--branch")
            .arg(branch)
            .arg(source_url)
            .arg(dest)
            .output()
            .map_err(|e| SyncError::RemoteUnavailable(format!("Failed to run git: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SyncError::RemoteUnavailable(format!(
                "Clone of {}@{} failed: {}",
                source_url,
                branch,
                stderr.trim()
            )));
        }
        Ok(())
    }
}
