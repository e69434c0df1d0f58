pub mod types;

pub use types::AnalysisReport;

use colored::Colorize;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::analysis::metrics::monthly_commits;
use crate::analysis::scoring::round_to;
use crate::analysis::{DerivedFlags, EffectivenessMetrics, RawSignals};
use types::{
    Analysis, ContributorSummary, EffectivenessAnalysis, RepoSummary, Scores, TechnicalAnalysis,
    WeeklyCommits,
};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report file: {0}")]
    FileWrite(#[from] std::io::Error),
}

/// Assemble the analyzer output from fetched signals and the values derived
/// from them.
pub fn build(
    raw: RawSignals,
    flags: &DerivedFlags,
    metrics: &EffectivenessMetrics,
    scores: Scores,
) -> AnalysisReport {
    let commit_activity = raw
        .commit_activity
        .iter()
        .map(|week| WeeklyCommits {
            week: week.week,
            commits: week.total,
        })
        .collect();
    let monthly_commits = monthly_commits(&raw.commit_activity);

    AnalysisReport {
        repo: RepoSummary {
            name: raw.repo.name,
            description: raw.repo.description,
            created_at: raw.repo.created_at,
            pushed_at: raw.repo.pushed_at,
            stars: raw.repo.stargazers_count,
            forks: raw.repo.forks_count,
            open_issues: raw.repo.open_issues_count,
            languages: raw.languages,
            contributors: raw
                .contributors
                .into_iter()
                .map(|c| ContributorSummary {
                    login: c.login,
                    contributions: c.contributions,
                })
                .collect(),
        },
        analysis: Analysis {
            technical: TechnicalAnalysis {
                has_ci: flags.has_ci,
                has_tests: flags.has_tests,
                has_linting: flags.has_linting,
                has_todos: flags.has_todos,
                deploys_last_30_days: metrics.successful_deploys,
            },
            effectiveness: EffectivenessAnalysis {
                recent_commits: metrics.recent_commits,
                issues_closed_recently: metrics.issues_closed_recently,
                issue_resolution_rate_recent: round_to(metrics.issue_resolution_rate, 2),
                commit_activity,
                monthly_commits,
            },
        },
        scores,
    }
}

/// Output the report to terminal (default) or to a markdown file.
/// The narrative, when present, is appended as its own section.
#[instrument(skip(report, narrative), fields(repo = %report.repo.name))]
pub fn output(
    report: &AnalysisReport,
    narrative: Option<&str>,
    output_path: Option<&Path>,
) -> Result<(), ReportError> {
    match output_path {
        None => {
            debug!("writing report to terminal");
            print_terminal_report(report, narrative);
            Ok(())
        }
        Some(path) => {
            debug!(path = %path.display(), "writing report to file");
            std::fs::write(path, render_markdown(report, narrative))?;
            Ok(())
        }
    }
}

/// Format and print the report to the terminal with colors.
///
/// widget - Widgets for everyone
/// ★ 1200 | Forks: 80 | Open issues: 0
///
/// ═══ Technical Health: 7 / 12 ═══
/// ✔ Continuous integration
/// ✘ Automated tests
/// ...
fn print_terminal_report(report: &AnalysisReport, narrative: Option<&str>) {
    let repo = &report.repo;
    let technical = &report.analysis.technical;
    let effectiveness = &report.analysis.effectiveness;
    let scores = &report.scores;

    println!();
    match &repo.description {
        Some(description) => println!("{} - {}", repo.name.bold(), description),
        None => println!("{}", repo.name.bold()),
    }
    println!(
        "★ {} | Forks: {} | Open issues: {}",
        repo.stars, repo.forks, repo.open_issues
    );
    if !repo.languages.is_empty() {
        println!("Languages: {}", language_shares(report).join(", "));
    }
    println!();

    println!(
        "═══ Technical Health: {} / {} ═══",
        colorize_score(scores.technical_health.value, scores.technical_health.out_of),
        scores.technical_health.out_of
    );
    for (label, ok) in checklist(technical) {
        let mark = if ok { "✔".green() } else { "✘".red() };
        println!("  {} {}", mark, label);
    }
    println!("  Successful deploys (30 days): {}", technical.deploys_last_30_days);
    println!();

    println!(
        "═══ Effectiveness: {} / {} ═══",
        colorize_score(scores.effectiveness.value, scores.effectiveness.out_of),
        scores.effectiveness.out_of
    );
    println!("  Commits (last 4 weeks): {}", effectiveness.recent_commits);
    println!("  Issues closed (30 days): {}", effectiveness.issues_closed_recently);
    println!(
        "  Issue resolution rate: {:.0}%",
        effectiveness.issue_resolution_rate_recent * 100.0
    );
    if !effectiveness.monthly_commits.is_empty() {
        println!("  Commits per month:");
        for month in &effectiveness.monthly_commits {
            println!("    {}  {}", month.month, month.commits);
        }
    }
    println!();

    if let Some(narrative) = narrative {
        println!("═══ Appendix ═══");
        println!("{}", narrative);
        println!();
    }

    println!("═══ Combined: {} ═══", scores.combined.to_string().bold());
    println!();
}

/// Render the report as markdown.
fn render_markdown(report: &AnalysisReport, narrative: Option<&str>) -> String {
    let repo = &report.repo;
    let technical = &report.analysis.technical;
    let effectiveness = &report.analysis.effectiveness;
    let scores = &report.scores;

    let mut md = String::new();
    md.push_str(&format!("# {}\n\n", repo.name));
    if let Some(description) = &repo.description {
        md.push_str(&format!("{}\n\n", description));
    }
    md.push_str(&format!(
        "**Stars:** {} | **Forks:** {} | **Open issues:** {}\n\n",
        repo.stars, repo.forks, repo.open_issues
    ));
    if !repo.languages.is_empty() {
        md.push_str(&format!("**Languages:** {}\n\n", language_shares(report).join(", ")));
    }

    md.push_str(&format!(
        "## Technical Health: {} / {}\n\n",
        scores.technical_health.value, scores.technical_health.out_of
    ));
    for (label, ok) in checklist(technical) {
        md.push_str(&format!("- [{}] {}\n", if ok { "x" } else { " " }, label));
    }
    md.push_str(&format!(
        "\nSuccessful deploys in the last 30 days: {}\n\n",
        technical.deploys_last_30_days
    ));

    md.push_str(&format!(
        "## Effectiveness: {} / {}\n\n",
        scores.effectiveness.value, scores.effectiveness.out_of
    ));
    md.push_str(&format!("- Commits (last 4 weeks): {}\n", effectiveness.recent_commits));
    md.push_str(&format!(
        "- Issues closed (30 days): {}\n",
        effectiveness.issues_closed_recently
    ));
    md.push_str(&format!(
        "- Issue resolution rate: {:.0}%\n\n",
        effectiveness.issue_resolution_rate_recent * 100.0
    ));

    if !effectiveness.monthly_commits.is_empty() {
        md.push_str("| Month | Commits |\n|---|---|\n");
        for month in &effectiveness.monthly_commits {
            md.push_str(&format!("| {} | {} |\n", month.month, month.commits));
        }
        md.push('\n');
    }

    if let Some(narrative) = narrative {
        md.push_str("## Appendix\n\n");
        md.push_str(narrative.trim_end());
        md.push_str("\n\n");
    }

    md.push_str(&format!("## Combined Score: {}\n", scores.combined));
    md
}

fn checklist(technical: &TechnicalAnalysis) -> [(&'static str, bool); 4] {
    [
        ("Continuous integration", technical.has_ci),
        ("Automated tests", technical.has_tests),
        ("Linting / formatting config", technical.has_linting),
        ("No TODO / legacy paths", !technical.has_todos),
    ]
}

/// Languages as "Rust 97%", largest first.
fn language_shares(report: &AnalysisReport) -> Vec<String> {
    let total: u64 = report.repo.languages.values().sum();
    let mut languages: Vec<_> = report.repo.languages.iter().collect();
    languages.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    languages
        .into_iter()
        .map(|(name, bytes)| {
            let share = if total == 0 {
                0.0
            } else {
                *bytes as f64 * 100.0 / total as f64
            };
            format!("{} {:.0}%", name, share)
        })
        .collect()
}

/// Green in the top third of the range, yellow in the middle, red below.
fn colorize_score(value: f64, out_of: f64) -> colored::ColoredString {
    let text = value.to_string();
    let ratio = if out_of > 0.0 { value / out_of } else { 0.0 };
    if ratio >= 2.0 / 3.0 {
        text.green().bold()
    } else if ratio >= 1.0 / 3.0 {
        text.yellow().bold()
    } else {
        text.red().bold()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::scoring;
    use crate::analysis::tests::widget_repo;
    use crate::github::{Contributor, WeeklyActivity};

    fn sample_report() -> AnalysisReport {
        let raw = RawSignals {
            repo: widget_repo(),
            languages: [("Rust".to_string(), 900), ("Shell".to_string(), 100)]
                .into_iter()
                .collect(),
            contributors: vec![Contributor {
                login: "alice".to_string(),
                contributions: 42,
            }],
            commit_activity: vec![
                WeeklyActivity {
                    week: 1_704_585_600,
                    total: 3,
                },
                WeeklyActivity {
                    week: 1_707_004_800,
                    total: 5,
                },
            ],
            ..RawSignals::default()
        };
        let flags = DerivedFlags {
            has_ci: true,
            ..DerivedFlags::default()
        };
        let metrics = EffectivenessMetrics {
            recent_commits: 8,
            issues_closed_recently: 2,
            issue_resolution_rate: 2.0 / 3.0,
            successful_deploys: 4,
        };
        let scores = scoring::score(&flags, &metrics);
        build(raw, &flags, &metrics, scores)
    }

    #[test]
    fn test_build_copies_repo_summary() {
        let report = sample_report();
        assert_eq!(report.repo.name, "widget");
        assert_eq!(report.repo.stars, 1200);
        assert_eq!(report.repo.contributors[0].login, "alice");
        assert_eq!(report.repo.languages.len(), 2);
    }

    #[test]
    fn test_build_rounds_resolution_rate() {
        let report = sample_report();
        assert_eq!(report.analysis.effectiveness.issue_resolution_rate_recent, 0.67);
    }

    #[test]
    fn test_build_commit_series() {
        let report = sample_report();
        let effectiveness = &report.analysis.effectiveness;
        assert_eq!(effectiveness.commit_activity.len(), 2);
        assert_eq!(effectiveness.commit_activity[1].commits, 5);
        assert_eq!(effectiveness.monthly_commits.len(), 2);
        assert_eq!(effectiveness.monthly_commits[0].month, "2024-01");
    }

    #[test]
    fn test_build_response_shape() {
        let value = serde_json::to_value(sample_report()).unwrap();
        assert!(value["repo"]["languages"]["Rust"].is_u64());
        assert_eq!(value["analysis"]["technical"]["deploysLast30Days"], 4);
        assert_eq!(value["analysis"]["effectiveness"]["recentCommits"], 8);
        assert!(value["analysis"]["effectiveness"]["commitActivity"].is_array());
        assert_eq!(value["scores"]["effectiveness"]["outOf"], 10.0);
        assert!(value["scores"]["combined"].is_f64());
    }

    #[test]
    fn test_language_shares_sorted_by_size() {
        assert_eq!(language_shares(&sample_report()), vec!["Rust 90%", "Shell 10%"]);
    }

    #[test]
    fn test_render_markdown() {
        let md = render_markdown(&sample_report(), Some("A healthy codebase.\n"));
        assert!(md.contains("# widget"));
        assert!(md.contains("- [x] Continuous integration"));
        assert!(md.contains("- [ ] Automated tests"));
        assert!(md.contains("| 2024-02 | 5 |"));
        assert!(md.contains("## Appendix\n\nA healthy codebase.\n"));
        assert!(md.contains("## Combined Score:"));
    }

    #[test]
    fn test_render_markdown_without_narrative() {
        let md = render_markdown(&sample_report(), None);
        assert!(!md.contains("## Appendix"));
    }

    #[test]
    fn test_output_to_file() {
        let path = std::env::temp_dir().join("tech-health-test-report.md");
        output(&sample_report(), None, Some(&path)).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("## Technical Health"));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_output_to_terminal() {
        // Should not panic
        output(&sample_report(), Some("Narrative"), None).unwrap();
    }
}
