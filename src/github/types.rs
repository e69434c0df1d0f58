use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

/// Owner/name pair extracted by parse_repo_url() in github/mod.rs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoId {
    pub owner: String,
    pub name: String,
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Repository metadata from GET /repos/{owner}/{repo}.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RepoInfo {
    pub name: String,
    pub description: Option<String>,
    pub created_at: Option<String>,
    pub pushed_at: Option<String>,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub open_issues_count: u64,
}

/// Language name to byte count.
pub type Languages = BTreeMap<String, u64>;

#[derive(Debug, Clone, Deserialize)]
pub struct Contributor {
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub contributions: u64,
}

/// Response of GET /git/trees/HEAD?recursive=1.
#[derive(Debug, Default, Deserialize)]
pub struct Tree {
    #[serde(default)]
    pub tree: Vec<TreeEntry>,
    /// Set by GitHub when the listing exceeded its size limit
    #[serde(default)]
    pub truncated: bool,
}

#[derive(Debug, Deserialize)]
pub struct TreeEntry {
    pub path: String,
}

/// One bucket of GET /stats/commit_activity. `week` is a unix timestamp
/// (seconds) of the Sunday starting the week.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WeeklyActivity {
    pub week: i64,
    pub total: u64,
}

/// Only the number of issues is used, so their payloads are skipped.
pub type IssueRef = serde::de::IgnoredAny;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueState {
    Open,
    Closed,
}

impl IssueState {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueState::Open => "open",
            IssueState::Closed => "closed",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct WorkflowRuns {
    #[serde(default)]
    pub workflow_runs: Vec<WorkflowRun>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowRun {
    /// None while the run is still in progress
    pub conclusion: Option<String>,
}

impl WorkflowRun {
    pub fn succeeded(&self) -> bool {
        self.conclusion.as_deref() == Some("success")
    }
}
