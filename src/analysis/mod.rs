pub mod flags;
pub mod metrics;
pub mod scoring;

pub use flags::{DerivedFlags, PathSignals};
pub use metrics::EffectivenessMetrics;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::{debug, info_span, instrument, warn, Instrument};

use crate::github::{
    Contributor, GitHubError, IssueState, Languages, RepoId, RepoInfo, RepositorySource,
    WeeklyActivity, WorkflowRun,
};
use crate::report::{self, AnalysisReport};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Failed to fetch repository {repo}: {source}")]
    Upstream {
        repo: String,
        #[source]
        source: GitHubError,
    },
}

/// Everything fetched for one analysis. Lives only for the request.
#[derive(Debug, Default)]
pub struct RawSignals {
    pub repo: RepoInfo,
    pub languages: Languages,
    pub contributors: Vec<Contributor>,
    pub file_paths: Vec<String>,
    pub commit_activity: Vec<WeeklyActivity>,
    pub recently_closed_issues: usize,
    pub open_issues: usize,
    pub closed_issues: usize,
    pub workflow_runs: Vec<WorkflowRun>,
}

/// Fetch all signals for `id` in two concurrent batches.
///
/// Only the repository metadata call is fatal. Every other call falls back
/// to an empty value and logs a warning, so a partially readable repository
/// still produces a report.
pub async fn collect_signals(
    source: &dyn RepositorySource,
    id: &RepoId,
    now: DateTime<Utc>,
) -> Result<RawSignals, AnalysisError> {
    let since = now - Duration::days(metrics::WINDOW_DAYS);

    let (repo, languages, contributors, file_paths) = tokio::join!(
        source
            .repo(id)
            .instrument(info_span!("fetch", call = "repo")),
        source
            .languages(id)
            .instrument(info_span!("fetch", call = "languages")),
        source
            .contributors(id)
            .instrument(info_span!("fetch", call = "contributors")),
        source
            .file_paths(id)
            .instrument(info_span!("fetch", call = "tree")),
    );

    let repo = repo.map_err(|source| AnalysisError::Upstream {
        repo: id.to_string(),
        source,
    })?;

    let (commit_activity, recently_closed, workflow_runs, open, closed) = tokio::join!(
        source
            .commit_activity(id)
            .instrument(info_span!("fetch", call = "commit_activity")),
        source
            .issues(id, IssueState::Closed, Some(since))
            .instrument(info_span!("fetch", call = "recently_closed_issues")),
        source
            .workflow_runs(id, since)
            .instrument(info_span!("fetch", call = "workflow_runs")),
        source
            .issues(id, IssueState::Open, None)
            .instrument(info_span!("fetch", call = "open_issues")),
        source
            .issues(id, IssueState::Closed, None)
            .instrument(info_span!("fetch", call = "closed_issues")),
    );

    Ok(RawSignals {
        repo,
        languages: or_default("languages", languages),
        contributors: or_default("contributors", contributors),
        file_paths: or_default("tree", file_paths),
        commit_activity: or_default("commit_activity", commit_activity),
        recently_closed_issues: or_default("recently_closed_issues", recently_closed).len(),
        open_issues: or_default("open_issues", open).len(),
        closed_issues: or_default("closed_issues", closed).len(),
        workflow_runs: or_default("workflow_runs", workflow_runs),
    })
}

fn or_default<T: Default>(call: &str, result: Result<T, GitHubError>) -> T {
    result.unwrap_or_else(|err| {
        warn!(call, error = %err, "GitHub call failed, using empty default");
        T::default()
    })
}

/// Fetch, derive and score one repository.
#[instrument(skip_all, fields(repo = %id))]
pub async fn analyze(
    source: &dyn RepositorySource,
    signals: &PathSignals,
    id: &RepoId,
    now: DateTime<Utc>,
) -> Result<AnalysisReport, AnalysisError> {
    let raw = collect_signals(source, id, now).await?;
    debug!(
        paths = raw.file_paths.len(),
        weeks = raw.commit_activity.len(),
        runs = raw.workflow_runs.len(),
        "collected signals"
    );

    let flags = signals.detect(&raw.file_paths);
    let metrics = EffectivenessMetrics::from_signals(&raw);
    let scores = scoring::score(&flags, &metrics);
    debug!(
        ?flags,
        ?metrics,
        technical = scores.technical_health.value,
        effectiveness = scores.effectiveness.value,
        "scored repository"
    );

    Ok(report::build(raw, &flags, &metrics, scores))
}
