use super::flags::DerivedFlags;
use super::metrics::EffectivenessMetrics;
use crate::report::types::{EffectivenessBreakdown, ScoreCard, Scores, TechnicalBreakdown};

pub const TECHNICAL_MAX: f64 = 12.0;
pub const EFFECTIVENESS_MAX: f64 = 10.0;

const MAX_SCORED_DEPLOYS_TECHNICAL: usize = 5;
const MAX_SCORED_DEPLOYS_EFFECTIVENESS: usize = 10;
const MAX_SCORED_COMMITS: u64 = 20;

/// Technical health components. Each is bounded on its own; the sum is at
/// most TECHNICAL_MAX.
pub fn technical_breakdown(
    flags: &DerivedFlags,
    metrics: &EffectivenessMetrics,
) -> TechnicalBreakdown {
    TechnicalBreakdown {
        ci_score: if flags.has_ci { 2.0 } else { 0.0 },
        test_score: if flags.has_tests { 2.5 } else { 0.0 },
        lint_score: if flags.has_linting { 1.5 } else { 0.0 },
        todo_score: if flags.has_todos { 0.0 } else { 1.5 },
        deploy_score: metrics.successful_deploys.min(MAX_SCORED_DEPLOYS_TECHNICAL) as f64 * 0.5,
        issue_score: issue_score(metrics.issue_resolution_rate),
    }
}

/// Tiered score for the issue resolution rate, 0 to 2.
pub fn issue_score(rate: f64) -> f64 {
    if rate >= 0.9 {
        2.0
    } else if rate >= 0.75 {
        1.5
    } else if rate >= 0.5 {
        1.0
    } else if rate >= 0.25 {
        0.5
    } else {
        0.0
    }
}

/// Unrounded effectiveness components: commits (max 4), deploys (max 4),
/// issue resolution (max 2).
pub fn effectiveness_breakdown(metrics: &EffectivenessMetrics) -> EffectivenessBreakdown {
    EffectivenessBreakdown {
        commit_activity: metrics.recent_commits.min(MAX_SCORED_COMMITS) as f64 * 0.2,
        deployment_frequency: metrics.successful_deploys.min(MAX_SCORED_DEPLOYS_EFFECTIVENESS)
            as f64
            * 0.4,
        issue_resolution: (metrics.issue_resolution_rate * 10.0).min(2.0),
    }
}

/// Both score cards plus their combined value, rounded for presentation.
pub fn score(flags: &DerivedFlags, metrics: &EffectivenessMetrics) -> Scores {
    let technical = technical_breakdown(flags, metrics);
    let technical_value = round_to(technical.total().clamp(0.0, TECHNICAL_MAX), 1);

    let effectiveness = effectiveness_breakdown(metrics);
    let effectiveness_value = round_to(effectiveness.total().clamp(0.0, EFFECTIVENESS_MAX), 1);

    Scores {
        technical_health: ScoreCard {
            value: technical_value,
            out_of: TECHNICAL_MAX,
            breakdown: technical,
        },
        effectiveness: ScoreCard {
            value: effectiveness_value,
            out_of: EFFECTIVENESS_MAX,
            breakdown: EffectivenessBreakdown {
                commit_activity: round_to(effectiveness.commit_activity, 1),
                deployment_frequency: round_to(effectiveness.deployment_frequency, 1),
                issue_resolution: round_to(effectiveness.issue_resolution, 1),
            },
        },
        combined: round_to(technical_value + effectiveness_value, 1),
    }
}

/// Round half away from zero to `places` decimals.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
