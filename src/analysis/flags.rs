use regex::{Regex, RegexBuilder};

use crate::config::{ConfigError, PatternConfig};

const CI_PATTERN: &str = r"\.github/workflows|\.gitlab-ci|vercel\.json|netlify\.toml";
const TEST_PATTERN: &str = r"test|__tests__|\.spec\.|\.test\.";
const LINT_PATTERN: &str = r"\.eslintrc|prettier|tsconfig\.json";
const TODO_PATTERN: &str = r"todo|deprecated|legacy";

/// Booleans derived from the repository's file paths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DerivedFlags {
    pub has_ci: bool,
    pub has_tests: bool,
    pub has_linting: bool,
    /// Paths that suggest leftover work or legacy code
    pub has_todos: bool,
}

/// Compiled case-insensitive path patterns, one group per flag.
///
/// Built once at startup; the built-in pattern of each flag always comes
/// first, followed by any extras from `[patterns]` in the config.
#[derive(Debug, Clone)]
pub struct PathSignals {
    ci: Vec<Regex>,
    tests: Vec<Regex>,
    linting: Vec<Regex>,
    todos: Vec<Regex>,
}

impl PathSignals {
    pub fn new(extra: &PatternConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            ci: compile("ci", CI_PATTERN, &extra.ci)?,
            tests: compile("tests", TEST_PATTERN, &extra.tests)?,
            linting: compile("linting", LINT_PATTERN, &extra.linting)?,
            todos: compile("todos", TODO_PATTERN, &extra.todos)?,
        })
    }

    /// Match every path against every group. A flag is set when any path
    /// matches any pattern of its group.
    pub fn detect<S: AsRef<str>>(&self, paths: &[S]) -> DerivedFlags {
        let any = |patterns: &[Regex]| {
            paths
                .iter()
                .any(|path| patterns.iter().any(|re| re.is_match(path.as_ref())))
        };

        DerivedFlags {
            has_ci: any(&self.ci),
            has_tests: any(&self.tests),
            has_linting: any(&self.linting),
            has_todos: any(&self.todos),
        }
    }
}

fn compile(
    flag: &'static str,
    builtin: &str,
    extra: &[String],
) -> Result<Vec<Regex>, ConfigError> {
    std::iter::once(builtin)
        .chain(extra.iter().map(String::as_str))
        .map(|pattern| {
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|source| ConfigError::Pattern {
                    flag,
                    pattern: pattern.to_string(),
                    source,
                })
        })
        .collect()
}
