//! Watcher configuration
//!
//! Loaded from TOML or built in code. Every field has a default, so an
//! empty file is a valid configuration.

use crate::error::{Result, WatchError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default stat polling interval in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5007;

const MIN_POLL_INTERVAL_MS: u64 = 1;
const MAX_POLL_INTERVAL_MS: u64 = 3_600_000;

/// Polling watcher configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Interval between stats of each watched path (default: 5007ms)
    pub poll_interval_ms: u64,

    /// Traverse symbolic links to directories (default: false)
    pub follow_symlinks: bool,

    /// Paths excluded from watching
    pub ignore: IgnoreConfig,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            follow_symlinks: false,
            ignore: IgnoreConfig::default(),
        }
    }
}

impl WatcherConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| WatchError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Polling interval as a [`Duration`]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Set the polling interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if !(MIN_POLL_INTERVAL_MS..=MAX_POLL_INTERVAL_MS).contains(&self.poll_interval_ms) {
            return Err(WatchError::InvalidConfig(format!(
                "poll_interval_ms must be between {} and {} (got {})",
                MIN_POLL_INTERVAL_MS, MAX_POLL_INTERVAL_MS, self.poll_interval_ms
            )));
        }

        if let Some(name) = &self.ignore.ignore_file {
            if name.is_empty() {
                return Err(WatchError::InvalidConfig(
                    "ignore.ignore_file must not be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Ignore configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IgnoreConfig {
    /// Skip .git/.hg/.jj/.svn directories (default: false)
    pub ignore_vcs: bool,

    /// Additional patterns (gitignore syntax)
    pub patterns: Vec<String>,

    /// Ignore file under the watch root, e.g. ".watchignore"
    pub ignore_file: Option<String>,
}
