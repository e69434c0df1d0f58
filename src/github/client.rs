use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use super::types::{Tree, WorkflowRuns};
use super::{
    Contributor, GitHubError, IssueRef, IssueState, Languages, RepoId, RepoInfo,
    RepositorySource, WeeklyActivity, WorkflowRun,
};
use crate::config::Config;

const USER_AGENT: &str = "TechHealthAnalyzer";
const ACCEPT: &str = "application/vnd.github+json";

/// Fixed page size for list endpoints; no further pages are requested.
pub const PAGE_SIZE: u32 = 100;

/// GitHub REST API client authenticated with a personal access token.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    token: String,
    api_base: String,
}

impl GitHubClient {
    pub fn new(token: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            token: token.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Build a client from config, failing when no token is available.
    pub fn from_config(config: &Config) -> Result<Self, GitHubError> {
        let token = config.github_token().ok_or(GitHubError::MissingToken)?;
        Ok(Self::new(token, config.github.api_base.clone()))
    }

    fn repo_url(&self, id: &RepoId, suffix: &str) -> String {
        format!("{}/repos/{}/{}{}", self.api_base, id.owner, id.name, suffix)
    }

    #[instrument(skip_all, fields(url = %url))]
    async fn get(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<reqwest::Response, GitHubError> {
        let response = self
            .http
            .get(url)
            .header("User-Agent", USER_AGENT)
            .header("Accept", ACCEPT)
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .await?
            .error_for_status()?;
        debug!(status = %response.status(), "GitHub API response");
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, GitHubError> {
        Ok(self.get(url, query).await?.json::<T>().await?)
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[async_trait]
impl RepositorySource for GitHubClient {
    async fn repo(&self, id: &RepoId) -> Result<RepoInfo, GitHubError> {
        self.get_json(&self.repo_url(id, ""), &[]).await
    }

    async fn languages(&self, id: &RepoId) -> Result<Languages, GitHubError> {
        self.get_json(&self.repo_url(id, "/languages"), &[]).await
    }

    async fn contributors(&self, id: &RepoId) -> Result<Vec<Contributor>, GitHubError> {
        let query = [("per_page", PAGE_SIZE.to_string())];
        self.get_json(&self.repo_url(id, "/contributors"), &query)
            .await
    }

    async fn file_paths(&self, id: &RepoId) -> Result<Vec<String>, GitHubError> {
        let query = [("recursive", "1".to_string())];
        let tree: Tree = self
            .get_json(&self.repo_url(id, "/git/trees/HEAD"), &query)
            .await?;
        if tree.truncated {
            debug!(entries = tree.tree.len(), "file tree truncated by GitHub");
        }
        Ok(tree.tree.into_iter().map(|entry| entry.path).collect())
    }

    async fn commit_activity(&self, id: &RepoId) -> Result<Vec<WeeklyActivity>, GitHubError> {
        let response = self
            .get(&self.repo_url(id, "/stats/commit_activity"), &[])
            .await?;
        // 202 while GitHub computes the statistics, 204 for empty repositories
        if matches!(
            response.status(),
            StatusCode::ACCEPTED | StatusCode::NO_CONTENT
        ) {
            debug!(status = %response.status(), "commit statistics not available yet");
            return Ok(Vec::new());
        }
        Ok(response.json::<Vec<WeeklyActivity>>().await?)
    }

    async fn issues(
        &self,
        id: &RepoId,
        state: IssueState,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<IssueRef>, GitHubError> {
        let mut query = vec![
            ("state", state.as_str().to_string()),
            ("per_page", PAGE_SIZE.to_string()),
        ];
        if let Some(since) = since {
            query.push(("since", timestamp(since)));
        }
        self.get_json(&self.repo_url(id, "/issues"), &query).await
    }

    async fn workflow_runs(
        &self,
        id: &RepoId,
        created_since: DateTime<Utc>,
    ) -> Result<Vec<WorkflowRun>, GitHubError> {
        let query = [
            ("created", format!(">={}", timestamp(created_since))),
            ("per_page", PAGE_SIZE.to_string()),
        ];
        let runs: WorkflowRuns = self
            .get_json(&self.repo_url(id, "/actions/runs"), &query)
            .await?;
        Ok(runs.workflow_runs)
    }
}
