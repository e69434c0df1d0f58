use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = ".tech-health.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid {flag} pattern {pattern:?}: {source}")]
    Pattern {
        flag: &'static str,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Top-level configuration loaded from .tech-health.toml.
/// Every section is optional; the service runs with zero config.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// GitHub-specific settings
    #[serde(default)]
    pub github: GitHubConfig,

    /// Text-generation provider settings
    #[serde(default)]
    pub llm: LlmConfig,

    /// HTTP listener settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Extra path patterns appended to the built-in flag patterns
    #[serde(default)]
    pub patterns: PatternConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubConfig {
    /// GitHub API token. If None, falls back to GITHUB_TOKEN env var.
    pub token: Option<String>,

    #[serde(default = "default_github_api_base")]
    pub api_base: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_base: default_github_api_base(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    /// Provider API key. If None, falls back to ANTHROPIC_API_KEY env var.
    pub api_key: Option<String>,

    #[serde(default = "default_llm_api_base")]
    pub api_base: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Retries after the first attempt, transient failures only
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry; doubles on each further retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: default_llm_api_base(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    /// Listen port. The PORT env var takes precedence when set.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatternConfig {
    #[serde(default)]
    pub ci: Vec<String>,
    #[serde(default)]
    pub tests: Vec<String>,
    #[serde(default)]
    pub linting: Vec<String>,
    #[serde(default)]
    pub todos: Vec<String>,
}

fn default_github_api_base() -> String {
    "https://api.github.com".to_string()
}

fn default_llm_api_base() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_model() -> String {
    "claude-3-haiku-20240307".to_string()
}

fn default_temperature() -> f32 {
    1.0
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from `path`, or from .tech-health.toml in the
    /// current directory when no path is given. A missing default file yields
    /// the default config; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::load_from(path)?
                } else {
                    Config::default()
                }
            }
        };

        if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse().ok()) {
            config.server.port = port;
        }

        Ok(config)
    }

    /// Load from a specific path.
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Resolve the GitHub token: config file value takes precedence,
    /// falls back to GITHUB_TOKEN env var. Empty values count as unset.
    pub fn github_token(&self) -> Option<String> {
        non_empty(self.github.token.clone())
            .or_else(|| non_empty(std::env::var("GITHUB_TOKEN").ok()))
    }

    /// Resolve the provider key the same way, falling back to ANTHROPIC_API_KEY.
    pub fn llm_api_key(&self) -> Option<String> {
        non_empty(self.llm.api_key.clone())
            .or_else(|| non_empty(std::env::var("ANTHROPIC_API_KEY").ok()))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
