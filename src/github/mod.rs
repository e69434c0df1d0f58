pub mod client;
pub mod types;

pub use client::GitHubClient;
pub use types::{
    Contributor, IssueRef, IssueState, Languages, RepoId, RepoInfo, WeeklyActivity, WorkflowRun,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GitHub API request failed: {0}")]
    ApiRequest(#[from] reqwest::Error),

    #[error("Invalid repository URL: {0}")]
    InvalidUrl(String),

    #[error("GitHub token not found in config or environment")]
    MissingToken,
}

/// Read-only view of a hosted repository. GitHubClient talks to the REST
/// API; tests substitute canned data.
#[async_trait]
pub trait RepositorySource: Send + Sync {
    async fn repo(&self, id: &RepoId) -> Result<RepoInfo, GitHubError>;

    async fn languages(&self, id: &RepoId) -> Result<Languages, GitHubError>;

    async fn contributors(&self, id: &RepoId) -> Result<Vec<Contributor>, GitHubError>;

    /// Every path in the recursive tree of the default branch head.
    async fn file_paths(&self, id: &RepoId) -> Result<Vec<String>, GitHubError>;

    /// Weekly commit totals for the last year, oldest first.
    async fn commit_activity(&self, id: &RepoId) -> Result<Vec<WeeklyActivity>, GitHubError>;

    /// Issues in `state`, restricted to those updated at or after `since`.
    async fn issues(
        &self,
        id: &RepoId,
        state: IssueState,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<IssueRef>, GitHubError>;

    /// Workflow runs created at or after `created_since`.
    async fn workflow_runs(
        &self,
        id: &RepoId,
        created_since: DateTime<Utc>,
    ) -> Result<Vec<WorkflowRun>, GitHubError>;
}

/// Parse a GitHub repository URL into owner and name.
///
/// Accepts `https://github.com/{owner}/{repo}` with or without scheme,
/// `www.`, trailing path segments (`/tree/main`, `/issues`), query string or
/// a `.git` suffix.
pub fn parse_repo_url(url: &str) -> Result<RepoId, GitHubError> {
    let invalid = || GitHubError::InvalidUrl(url.to_string());
    let trimmed = url.trim();
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let parsed = reqwest::Url::parse(&with_scheme).map_err(|_| invalid())?;

    match parsed.host_str() {
        Some("github.com") | Some("www.github.com") => {}
        _ => return Err(invalid()),
    }

    let segments: Vec<_> = parsed
        .path_segments()
        .ok_or_else(invalid)?
        .filter(|segment| !segment.is_empty())
        .collect();

    if segments.len() < 2 {
        return Err(invalid());
    }

    let owner = segments[0];
    let name = segments[1].strip_suffix(".git").unwrap_or(segments[1]);
    if name.is_empty() {
        return Err(invalid());
    }

    Ok(RepoId {
        owner: owner.to_string(),
        name: name.to_string(),
    })
}
