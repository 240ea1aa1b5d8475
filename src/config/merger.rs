// Configuration merging with priority

use super::{ClientConfig, PollConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Partial configuration for merging
/// Uses Option<T> for all fields to support partial overrides
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PartialConfig {
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub debug: Option<bool>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub state_dir: Option<PathBuf>,
    #[serde(default)]
    pub poll: Option<PartialPollConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PartialPollConfig {
    pub initial_interval_ms: Option<u64>,
    pub max_interval_ms: Option<u64>,
    pub max_consecutive_failures: Option<u32>,
}

/// Configuration merger
/// Priority order: CLI -> Environment -> File -> Defaults
pub struct ConfigMerger {
    defaults: ClientConfig,
    file: Option<PartialConfig>,
    env: Option<PartialConfig>,
    cli: Option<PartialConfig>,
}

impl ConfigMerger {
    /// Create a new config merger with defaults
    pub fn new() -> Self {
        Self {
            defaults: ClientConfig::default(),
            file: None,
            env: None,
            cli: None,
        }
    }

    /// Set config read from `config.toml`
    pub fn with_file(mut self, config: Option<PartialConfig>) -> Self {
        self.file = config;
        self
    }

    /// Set environment overrides
    pub fn with_env(mut self, config: Option<PartialConfig>) -> Self {
        self.env = config;
        self
    }

    /// Set CLI overrides
    pub fn with_cli(mut self, config: Option<PartialConfig>) -> Self {
        self.cli = config;
        self
    }

    /// Merge all layers with priority
    pub fn merge(&self) -> ClientConfig {
        let mut result = self.defaults.clone();

        for layer in [&self.file, &self.env, &self.cli].into_iter().flatten() {
            result = self.merge_partial(&result, layer);
        }

        result
    }

    fn merge_partial(&self, base: &ClientConfig, partial: &PartialConfig) -> ClientConfig {
        ClientConfig {
            api_base_url: partial
                .api_base_url
                .clone()
                .unwrap_or_else(|| base.api_base_url.clone()),
            debug: partial.debug.unwrap_or(base.debug),
            request_timeout_secs: partial
                .request_timeout_secs
                .unwrap_or(base.request_timeout_secs),
            state_dir: partial
                .state_dir
                .clone()
                .unwrap_or_else(|| base.state_dir.clone()),
            poll: partial
                .poll
                .as_ref()
                .map(|p| self.merge_partial_poll(&base.poll, p))
                .unwrap_or_else(|| base.poll.clone()),
        }
    }

    fn merge_partial_poll(&self, base: &PollConfig, partial: &PartialPollConfig) -> PollConfig {
        PollConfig {
            initial_interval_ms: partial
                .initial_interval_ms
                .unwrap_or(base.initial_interval_ms),
            max_interval_ms: partial.max_interval_ms.unwrap_or(base.max_interval_ms),
            max_consecutive_failures: partial
                .max_consecutive_failures
                .unwrap_or(base.max_consecutive_failures),
        }
    }
}

impl Default for ConfigMerger {
    fn default() -> Self {
        Self::new()
    }
}
