//! Watcher configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

fn default_recursive() -> bool {
    true
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_poll_ms() -> u64 {
    100
}

/// File-system watcher configuration
///
/// Loadable from the `watcher:` section of `warden.yaml`:
///
/// ```yaml
/// watcher:
///   watch_paths:
///     - terraform
///     - .github/workflows
///   recursive: true
///   include_patterns:
///     - "**/*.tf"
///     - "**/*.yml"
///   exclude_patterns:
///     - "**/.git/**"
///     - "**/target/**"
///   debounce_ms: 500
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Paths to watch
    #[serde(default)]
    pub watch_paths: Vec<PathBuf>,

    /// Watch directories recursively
    #[serde(default = "default_recursive")]
    pub recursive: bool,

    /// Glob patterns a path must match to be observed; empty means all
    #[serde(default)]
    pub include_patterns: Vec<String>,

    /// Glob patterns that drop a path; checked before includes, exclusion
    /// always wins
    #[serde(default)]
    pub exclude_patterns: Vec<String>,

    /// Quiet period that must elapse before accumulated changes flush
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Bounded wait of the watch loop between raw notifications
    #[serde(default = "default_poll_ms")]
    pub poll_ms: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            watch_paths: Vec::new(),
            recursive: true,
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            debounce_ms: default_debounce_ms(),
            poll_ms: default_poll_ms(),
        }
    }
}

impl WatcherConfig {
    /// Debounce window as a duration
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Watch-loop poll interval as a duration
    pub fn poll(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }

    /// Parse a configuration from YAML
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a configuration from a YAML file
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }
}
