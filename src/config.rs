//! Client configuration loaded from environment variables.
//!
//! A `.env` file in the working directory is honoured for local use.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// What to do when a second intent targets an entity that already has a
/// mutation in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Wait for the in-flight mutation, then run (FIFO).
    Queue,
    /// Fail immediately with a concurrent modification error.
    Reject,
}

impl std::str::FromStr for ConflictPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "queue" => Ok(ConflictPolicy::Queue),
            "reject" => Ok(ConflictPolicy::Reject),
            other => Err(ConfigError::Invalid {
                name: "STORY_CONFLICT_POLICY",
                value: other.to_string(),
            }),
        }
    }
}

/// Log output format for the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Client configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the story API (no trailing slash)
    pub api_base_url: String,
    /// Path of the JSON file backing the durable store
    pub store_path: PathBuf,
    /// Maximum number of stories requested per fetch
    pub story_limit: u32,
    /// Behaviour on overlapping mutations of the same entity
    pub conflict_policy: ConflictPolicy,
    /// Per-request timeout for the HTTP client
    pub http_timeout: Duration,
    pub log_format: LogFormat,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:5000".to_string(),
            store_path: PathBuf::from(".story-session.test.json"),
            story_limit: 25,
            conflict_policy: ConflictPolicy::Queue,
            http_timeout: Duration::from_secs(10),
            log_format: LogFormat::Pretty,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let api_base_url = env::var("STORY_API_URL")
            .unwrap_or_else(|_| "https://hack-or-snooze-v3.herokuapp.com".to_string());
        let api_base_url = normalize_base_url(&api_base_url)?;

        let story_limit = match env::var("STORY_LIST_LIMIT") {
            Ok(v) => parse_positive("STORY_LIST_LIMIT", &v)?,
            Err(_) => 25,
        };

        let timeout_secs = match env::var("STORY_HTTP_TIMEOUT_SECS") {
            Ok(v) => parse_positive("STORY_HTTP_TIMEOUT_SECS", &v)?,
            Err(_) => 10,
        };

        let conflict_policy = env::var("STORY_CONFLICT_POLICY")
            .map(|v| v.parse::<ConflictPolicy>())
            .unwrap_or(Ok(ConflictPolicy::Queue))?;

        let log_format = match env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            Ok("pretty") | Err(_) => LogFormat::Pretty,
            Ok(other) => {
                return Err(ConfigError::Invalid {
                    name: "LOG_FORMAT",
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            api_base_url,
            store_path: env::var("STORY_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".story-session.json")),
            story_limit,
            conflict_policy,
            http_timeout: Duration::from_secs(u64::from(timeout_secs)),
            log_format,
        })
    }
}

fn parse_positive(name: &'static str, value: &str) -> Result<u32, ConfigError> {
    match value.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::Invalid {
            name,
            value: value.to_string(),
        }),
    }
}

/// Trim trailing slashes and require an http(s) scheme with a host.
pub fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let invalid = || ConfigError::Invalid {
        name: "STORY_API_URL",
        value: raw.to_string(),
    };

    let Some((scheme, rest)) = trimmed.split_once("://") else {
        return Err(invalid());
    };
    if !(scheme == "http" || scheme == "https") || rest.is_empty() || rest.starts_with('/') {
        return Err(invalid());
    }
    Ok(trimmed.to_string())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}
