use serde::Serialize;
use std::collections::BTreeMap;

/// Complete analyzer output, serialized as the `/analyze` response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub repo: RepoSummary,
    pub analysis: Analysis,
    pub scores: Scores,
}

/// Repository metadata echoed back to the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepoSummary {
    pub name: String,
    pub description: Option<String>,
    pub created_at: Option<String>,
    pub pushed_at: Option<String>,
    pub stars: u64,
    pub forks: u64,
    pub open_issues: u64,
    /// Language name to bytes of code
    pub languages: BTreeMap<String, u64>,
    pub contributors: Vec<ContributorSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContributorSummary {
    pub login: String,
    pub contributions: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub technical: TechnicalAnalysis,
    pub effectiveness: EffectivenessAnalysis,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TechnicalAnalysis {
    #[serde(rename = "hasCI")]
    pub has_ci: bool,
    #[serde(rename = "hasTests")]
    pub has_tests: bool,
    #[serde(rename = "hasLinting")]
    pub has_linting: bool,
    #[serde(rename = "hasTODOs")]
    pub has_todos: bool,
    #[serde(rename = "deploysLast30Days")]
    pub deploys_last_30_days: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectivenessAnalysis {
    pub recent_commits: u64,
    pub issues_closed_recently: usize,
    /// Rounded to two decimals
    pub issue_resolution_rate_recent: f64,
    pub commit_activity: Vec<WeeklyCommits>,
    pub monthly_commits: Vec<MonthlyCommits>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeeklyCommits {
    /// Unix timestamp (seconds) of the start of the week
    pub week: i64,
    pub commits: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyCommits {
    /// Calendar month, `YYYY-MM`
    pub month: String,
    pub commits: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scores {
    pub technical_health: ScoreCard<TechnicalBreakdown>,
    pub effectiveness: ScoreCard<EffectivenessBreakdown>,
    /// Sum of both score values
    pub combined: f64,
}

/// A bounded score with the components it was summed from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreCard<B> {
    pub value: f64,
    pub out_of: f64,
    pub breakdown: B,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalBreakdown {
    pub ci_score: f64,
    pub test_score: f64,
    pub lint_score: f64,
    pub todo_score: f64,
    pub deploy_score: f64,
    pub issue_score: f64,
}

impl TechnicalBreakdown {
    pub fn total(&self) -> f64 {
        self.ci_score
            + self.test_score
            + self.lint_score
            + self.todo_score
            + self.deploy_score
            + self.issue_score
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectivenessBreakdown {
    pub commit_activity: f64,
    pub deployment_frequency: f64,
    pub issue_resolution: f64,
}

impl EffectivenessBreakdown {
    pub fn total(&self) -> f64 {
        self.commit_activity + self.deployment_frequency + self.issue_resolution
    }
}
