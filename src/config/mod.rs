//! Client configuration
//!
//! Settings are layered, lowest priority first: built-in defaults, the
//! optional `~/.archgen/config.toml`, environment variables (`API_BASE_URL`,
//! `ARCHGEN_DEBUG`) and finally command-line flags.

mod merger;

pub use merger::{ConfigMerger, PartialConfig, PartialPollConfig};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api/v1";
pub const ENV_API_BASE_URL: &str = "API_BASE_URL";
pub const ENV_DEBUG: &str = "ARCHGEN_DEBUG";

const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid API base URL '{0}': expected an http(s) URL")]
    InvalidBaseUrl(String),

    #[error("Polling intervals are inconsistent: initial {initial_ms}ms exceeds cap {max_ms}ms")]
    InvalidPollIntervals { initial_ms: u64, max_ms: u64 },

    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Job polling settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    pub initial_interval_ms: u64,
    pub max_interval_ms: u64,
    /// Consecutive transport failures tolerated before a job is failed
    pub max_consecutive_failures: u32,
}

impl PollConfig {
    pub fn initial_interval(&self) -> Duration {
        Duration::from_millis(self.initial_interval_ms)
    }

    pub fn max_interval(&self) -> Duration {
        Duration::from_millis(self.max_interval_ms)
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_interval_ms: 3000,
            max_interval_ms: 10_000,
            max_consecutive_failures: 5,
        }
    }
}

/// Fully resolved client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub api_base_url: String,
    /// Enables request/response tracing in the transport
    pub debug: bool,
    pub request_timeout_secs: u64,
    pub state_dir: PathBuf,
    pub poll: PollConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            debug: false,
            request_timeout_secs: 30,
            state_dir: default_state_dir(),
            poll: PollConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.base_url();
        if url.is_empty() || !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl(self.api_base_url.clone()));
        }
        if self.poll.initial_interval_ms > self.poll.max_interval_ms {
            return Err(ConfigError::InvalidPollIntervals {
                initial_ms: self.poll.initial_interval_ms,
                max_ms: self.poll.max_interval_ms,
            });
        }
        Ok(())
    }
}

/// Get the global ~/.archgen directory
pub fn default_state_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".archgen")
}

/// Path of the optional config file inside a state directory
pub fn config_file_path(state_dir: &Path) -> PathBuf {
    state_dir.join(CONFIG_FILE_NAME)
}

/// Read a TOML config file, returning None if it doesn't exist
pub fn load_file_config(path: &Path) -> Result<Option<PartialConfig>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&content)
        .map(Some)
        .map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

/// Build the environment layer from a variable lookup
pub fn env_overrides_from<F>(lookup: F) -> PartialConfig
where
    F: Fn(&str) -> Option<String>,
{
    let api_base_url = lookup(ENV_API_BASE_URL).filter(|v| !v.trim().is_empty());
    let debug = lookup(ENV_DEBUG).map(|v| parse_flag(&v));

    PartialConfig {
        api_base_url,
        debug,
        ..Default::default()
    }
}

/// Build the environment layer from the process environment
pub fn env_overrides() -> PartialConfig {
    env_overrides_from(|key| std::env::var(key).ok())
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Load the merged configuration: defaults, file, environment, CLI
pub fn load_config(cli: Option<PartialConfig>) -> Result<ClientConfig, ConfigError> {
    let state_dir = cli
        .as_ref()
        .and_then(|c| c.state_dir.clone())
        .unwrap_or_else(default_state_dir);
    let file = load_file_config(&config_file_path(&state_dir))?;

    let config = ConfigMerger::new()
        .with_file(file)
        .with_env(Some(env_overrides()))
        .with_cli(cli)
        .merge();

    config.validate()?;
    log::debug!(
        "[ClientConfig] api_base_url={}, debug={}, state_dir={:?}",
        config.base_url(),
        config.debug,
        config.state_dir
    );
    Ok(config)
}
