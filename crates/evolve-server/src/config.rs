//! Server configuration.
//!
//! Everything comes from environment variables (after the binary has
//! loaded an optional `.env` file):
//!
//! | Variable | Default |
//! |---|---|
//! | `GROQ_API_KEY` | unset (generation disabled) |
//! | `GROQ_MODEL` | `llama-3.1-70b` |
//! | `GROQ_BASE_URL` | `https://api.groq.com/openai/v1` |
//! | `PORT` | `3000` |
//! | `SITE_DIR` | `site` (archive in `<SITE_DIR>/.history`) |
//! | `GENERATE_COOLDOWN_SECS` | `5` |
//! | `GITHUB_TOKEN`, `REPO_OWNER`, `REPO_NAME` | unset (no mirror) |

use evolve_provider::groq;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 3000;

/// Minimum time between accepted generation requests.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(5);

/// Name of the archive directory inside the site directory.
pub const HISTORY_DIR_NAME: &str = ".history";

/// GitHub REST API base.
pub const GITHUB_API_URL: &str = "https://api.github.com";

/// Upper bound on each GitHub request made by the publish mirror.
pub const GITHUB_TIMEOUT: Duration = Duration::from_secs(15);

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable is set but cannot be parsed.
    #[error("invalid value for {name}: {value:?} ({message})")]
    InvalidValue {
        name: &'static str,
        value: String,
        message: String,
    },
}

/// Where published files are mirrored on GitHub.
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    pub token: String,
    pub owner: String,
    pub repo: String,
    pub api_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// Resolved server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Chat-completion API key. Generation fails with a configuration error without it.
    pub api_key: Option<String>,
    /// Model identifier.
    pub model: String,
    /// Chat-completion API base URL.
    pub api_base_url: String,
    /// Upper bound on one completion call.
    pub request_timeout: Duration,
    /// Listen port.
    pub port: u16,
    /// Directory holding the live (and preview) files.
    pub site_dir: PathBuf,
    /// Directory holding one subdirectory per snapshot.
    pub history_dir: PathBuf,
    /// Minimum time between accepted generation requests.
    pub cooldown: Duration,
    /// Optional GitHub mirror for published files.
    pub github: Option<GitHubConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let site_dir = PathBuf::from("site");
        Self {
            api_key: None,
            model: groq::DEFAULT_MODEL.to_string(),
            api_base_url: groq::DEFAULT_BASE_URL.to_string(),
            request_timeout: groq::DEFAULT_TIMEOUT,
            port: DEFAULT_PORT,
            history_dir: site_dir.join(HISTORY_DIR_NAME),
            site_dir,
            cooldown: DEFAULT_COOLDOWN,
            github: None,
        }
    }
}

impl ServerConfig {
    /// Resolve configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve configuration from a variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        config.api_key = get("GROQ_API_KEY");
        if let Some(model) = get("GROQ_MODEL") {
            config.model = model;
        }
        if let Some(url) = get("GROQ_BASE_URL") {
            config.api_base_url = url;
        }
        if let Some(port) = get("PORT") {
            config.port = parse_value("PORT", &port)?;
        }
        if let Some(dir) = get("SITE_DIR") {
            config.site_dir = PathBuf::from(dir);
            config.history_dir = config.site_dir.join(HISTORY_DIR_NAME);
        }
        if let Some(secs) = get("GENERATE_COOLDOWN_SECS") {
            config.cooldown = Duration::from_secs(parse_value("GENERATE_COOLDOWN_SECS", &secs)?);
        }

        config.github = match (get("GITHUB_TOKEN"), get("REPO_OWNER"), get("REPO_NAME")) {
            (Some(token), Some(owner), Some(repo)) => Some(GitHubConfig {
                token,
                owner,
                repo,
                api_url: GITHUB_API_URL.to_string(),
                timeout: GITHUB_TIMEOUT,
            }),
            _ => None,
        };

        Ok(config)
    }

}

fn parse_value<T>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            name,
            value: value.to_string(),
            message: e.to_string(),
        })
}
