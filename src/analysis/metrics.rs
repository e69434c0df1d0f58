use chrono::DateTime;
use std::collections::BTreeMap;

use super::RawSignals;
use crate::github::{WeeklyActivity, WorkflowRun};
use crate::report::types::MonthlyCommits;

/// Trailing window for recently closed issues and workflow runs.
pub const WINDOW_DAYS: i64 = 30;

/// Number of trailing weekly buckets counted as recent commit activity.
pub const RECENT_WEEKS: usize = 4;

/// Activity measured over the trailing window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EffectivenessMetrics {
    pub recent_commits: u64,
    pub issues_closed_recently: usize,
    /// Unrounded, always in [0, 1]
    pub issue_resolution_rate: f64,
    pub successful_deploys: usize,
}

impl EffectivenessMetrics {
    pub fn from_signals(signals: &RawSignals) -> Self {
        Self {
            recent_commits: recent_commits(&signals.commit_activity),
            issues_closed_recently: signals.recently_closed_issues,
            issue_resolution_rate: resolution_rate(
                signals.recently_closed_issues,
                signals.open_issues,
                signals.closed_issues,
            ),
            successful_deploys: successful_deploys(&signals.workflow_runs),
        }
    }
}

/// Sum of the last RECENT_WEEKS weekly totals.
pub fn recent_commits(activity: &[WeeklyActivity]) -> u64 {
    let start = activity.len().saturating_sub(RECENT_WEEKS);
    activity[start..].iter().map(|week| week.total).sum()
}

/// Recently closed issues over all fetched issues, 0 when there are none.
pub fn resolution_rate(closed_recently: usize, open: usize, closed: usize) -> f64 {
    let total = open + closed;
    if total == 0 {
        return 0.0;
    }
    (closed_recently as f64 / total as f64).clamp(0.0, 1.0)
}

pub fn successful_deploys(runs: &[WorkflowRun]) -> usize {
    runs.iter().filter(|run| run.succeeded()).count()
}

/// Fold weekly buckets into calendar months (UTC), oldest first.
pub fn monthly_commits(activity: &[WeeklyActivity]) -> Vec<MonthlyCommits> {
    let mut months: BTreeMap<String, u64> = BTreeMap::new();
    for week in activity {
        let Some(start) = DateTime::from_timestamp(week.week, 0) else {
            continue;
        };
        *months.entry(start.format("%Y-%m").to_string()).or_default() += week.total;
    }
    months
        .into_iter()
        .map(|(month, commits)| MonthlyCommits { month, commits })
        .collect()
}
