//! Hook configuration loading and validation
//!
//! Hooks share a uniform settings block (`enabled`, `max_attempts`,
//! `cooldown_seconds`, `excluded_targets`, notification flags) plus
//! hook-specific thresholds. Configuration is YAML:
//!
//! ```yaml
//! restart:
//!   enabled: true
//!   max_attempts: 3
//!   cooldown_seconds: 60
//!   excluded_targets:
//!     - database
//! scaling:
//!   cpu_high: 85.0
//!   cpu_low: 20.0
//! log_patterns:
//!   rules:
//!     - name: oom-killer
//!       pattern: "Out of memory|OOMKilled"
//!       severity: critical
//!       remediation: restart_container
//! ```
//!
//! Invalid configuration is rejected up front with a message naming the
//! offending field, not discovered mid-remediation.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{HookError, Result};
use crate::retry::RetryPolicy;

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    3
}

fn default_cooldown_seconds() -> u64 {
    60
}

fn default_command_timeout_secs() -> u64 {
    30
}

/// Settings shared by every hook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookSettings {
    /// Whether the hook reacts to events at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Attempts allowed per target before it becomes terminal
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Minimum seconds between two attempts for the same target
    #[serde(default = "default_cooldown_seconds")]
    pub cooldown_seconds: u64,

    /// Targets the hook never acts on
    #[serde(default)]
    pub excluded_targets: Vec<String>,

    /// Log successful remediations at info level
    #[serde(default)]
    pub notify_on_success: bool,

    /// Log failed remediations at warn level
    #[serde(default = "default_true")]
    pub notify_on_failure: bool,
}

impl Default for HookSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: default_max_attempts(),
            cooldown_seconds: default_cooldown_seconds(),
            excluded_targets: Vec::new(),
            notify_on_success: false,
            notify_on_failure: true,
        }
    }
}

impl HookSettings {
    /// Derive the retry policy these settings describe
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            cooldown: Duration::from_secs(self.cooldown_seconds),
            excluded_targets: self
                .excluded_targets
                .iter()
                .cloned()
                .collect::<HashSet<String>>(),
        }
    }

    fn validate(&self, hook: &str) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(HookError::InvalidConfiguration(format!(
                "{hook}: max_attempts must be at least 1"
            )));
        }
        Ok(())
    }
}

/// Container restart hook configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestartHookConfig {
    #[serde(flatten)]
    pub settings: HookSettings,

    /// Deadline for each container runtime call
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,

    /// Wait before post-restart health verification
    #[serde(default = "default_verify_delay_ms")]
    pub verify_delay_ms: u64,

    /// Statuses that count as unhealthy
    #[serde(default = "default_unhealthy_statuses")]
    pub unhealthy_statuses: Vec<String>,
}

fn default_verify_delay_ms() -> u64 {
    1000
}

fn default_unhealthy_statuses() -> Vec<String> {
    vec!["unhealthy".to_string(), "critical".to_string()]
}

impl Default for RestartHookConfig {
    fn default() -> Self {
        Self {
            settings: HookSettings::default(),
            command_timeout_secs: default_command_timeout_secs(),
            verify_delay_ms: default_verify_delay_ms(),
            unhealthy_statuses: default_unhealthy_statuses(),
        }
    }
}

impl RestartHookConfig {
    /// Deadline for each runtime call
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    /// Wait before verification
    pub fn verify_delay(&self) -> Duration {
        Duration::from_millis(self.verify_delay_ms)
    }
}

/// Resource scaling hook configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalingHookConfig {
    #[serde(flatten)]
    pub settings: HookSettings,

    /// CPU percentage above which a sustained breach scales up
    #[serde(default = "default_cpu_high")]
    pub cpu_high: f64,

    /// CPU percentage below which a sustained breach scales down
    #[serde(default = "default_cpu_low")]
    pub cpu_low: f64,

    /// Memory percentage above which a sustained breach scales up
    #[serde(default = "default_memory_high")]
    pub memory_high: f64,

    /// Memory percentage below which a sustained breach scales down
    #[serde(default = "default_memory_low")]
    pub memory_low: f64,

    /// Window over which a breach must be sustained
    #[serde(default = "default_observation_window_secs")]
    pub observation_window_secs: u64,

    /// Samples required inside the window before acting
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,

    /// CPU limit applied when scaling up
    #[serde(default = "default_scale_up_cpus")]
    pub scale_up_cpus: f64,

    /// CPU limit applied when scaling down
    #[serde(default = "default_scale_down_cpus")]
    pub scale_down_cpus: f64,

    /// Memory limit (MiB) applied when scaling up
    #[serde(default = "default_scale_up_memory_mb")]
    pub scale_up_memory_mb: u64,

    /// Memory limit (MiB) applied when scaling down
    #[serde(default = "default_scale_down_memory_mb")]
    pub scale_down_memory_mb: u64,

    /// Deadline for each container runtime call
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
}

fn default_cpu_high() -> f64 {
    85.0
}

fn default_cpu_low() -> f64 {
    20.0
}

fn default_memory_high() -> f64 {
    90.0
}

fn default_memory_low() -> f64 {
    25.0
}

fn default_observation_window_secs() -> u64 {
    120
}

fn default_min_samples() -> usize {
    3
}

fn default_scale_up_cpus() -> f64 {
    2.0
}

fn default_scale_down_cpus() -> f64 {
    0.5
}

fn default_scale_up_memory_mb() -> u64 {
    1024
}

fn default_scale_down_memory_mb() -> u64 {
    256
}

impl Default for ScalingHookConfig {
    fn default() -> Self {
        Self {
            settings: HookSettings::default(),
            cpu_high: default_cpu_high(),
            cpu_low: default_cpu_low(),
            memory_high: default_memory_high(),
            memory_low: default_memory_low(),
            observation_window_secs: default_observation_window_secs(),
            min_samples: default_min_samples(),
            scale_up_cpus: default_scale_up_cpus(),
            scale_down_cpus: default_scale_down_cpus(),
            scale_up_memory_mb: default_scale_up_memory_mb(),
            scale_down_memory_mb: default_scale_down_memory_mb(),
            command_timeout_secs: default_command_timeout_secs(),
        }
    }
}

impl ScalingHookConfig {
    /// Window over which a breach must be sustained
    pub fn observation_window(&self) -> Duration {
        Duration::from_secs(self.observation_window_secs)
    }

    /// Deadline for each runtime call
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

/// Severity attached to a log pattern rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternSeverity {
    Info,
    Warning,
    Critical,
}

/// What a matched log pattern does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemediationAction {
    /// Restart the container the log line came from
    RestartContainer,
    /// Report only
    NotifyOnly,
}

/// One log pattern rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogPatternRule {
    /// Rule name, used in reports
    pub name: String,

    /// Regex matched against log lines
    pub pattern: String,

    /// Severity of a match
    pub severity: PatternSeverity,

    /// Action taken on a match
    pub remediation: RemediationAction,
}

/// Log pattern hook configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogPatternHookConfig {
    #[serde(flatten)]
    pub settings: HookSettings,

    /// Deadline for each container runtime call
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,

    /// Rules evaluated against each log line
    #[serde(default)]
    pub rules: Vec<LogPatternRule>,
}

impl Default for LogPatternHookConfig {
    fn default() -> Self {
        Self {
            settings: HookSettings::default(),
            command_timeout_secs: default_command_timeout_secs(),
            rules: Vec::new(),
        }
    }
}

impl LogPatternHookConfig {
    /// Deadline for each runtime call
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

/// Full hooks configuration document
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HooksConfig {
    /// Container restart hook
    #[serde(default)]
    pub restart: RestartHookConfig,

    /// Resource scaling hook
    #[serde(default)]
    pub scaling: ScalingHookConfig,

    /// Log pattern hook
    #[serde(default)]
    pub log_patterns: LogPatternHookConfig,
}

impl HooksConfig {
    /// Parse from YAML
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Reject configurations that cannot work
    pub fn validate(&self) -> Result<()> {
        self.restart.settings.validate("restart")?;
        self.scaling.settings.validate("scaling")?;
        self.log_patterns.settings.validate("log_patterns")?;

        if self.scaling.cpu_low >= self.scaling.cpu_high {
            return Err(HookError::InvalidConfiguration(format!(
                "scaling: cpu_low ({}) must be below cpu_high ({})",
                self.scaling.cpu_low, self.scaling.cpu_high
            )));
        }
        if self.scaling.memory_low >= self.scaling.memory_high {
            return Err(HookError::InvalidConfiguration(format!(
                "scaling: memory_low ({}) must be below memory_high ({})",
                self.scaling.memory_low, self.scaling.memory_high
            )));
        }
        if self.scaling.min_samples == 0 {
            return Err(HookError::InvalidConfiguration(
                "scaling: min_samples must be at least 1".to_string(),
            ));
        }

        for rule in &self.log_patterns.rules {
            if rule.name.is_empty() {
                return Err(HookError::InvalidConfiguration(
                    "log_patterns: rule name must not be empty".to_string(),
                ));
            }
            regex::Regex::new(&rule.pattern).map_err(|e| {
                HookError::InvalidConfiguration(format!(
                    "log_patterns: rule '{}' has an invalid pattern: {e}",
                    rule.name
                ))
            })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        HooksConfig::default().validate().unwrap();
        let settings = HookSettings::default();
        assert!(settings.enabled);
        assert_eq!(settings.max_attempts, 3);
        assert_eq!(settings.cooldown_seconds, 60);
        assert!(settings.notify_on_failure);
    }

    #[test]
    fn test_from_yaml_with_partial_sections() {
        let yaml = r#"
restart:
  max_attempts: 5
  excluded_targets:
    - database
log_patterns:
  rules:
    - name: oom-killer
      pattern: "OOMKilled"
      severity: critical
      remediation: restart_container
"#;
        let config = HooksConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.restart.settings.max_attempts, 5);
        assert_eq!(config.restart.settings.excluded_targets, vec!["database"]);
        // Untouched sections keep their defaults.
        assert_eq!(config.scaling.cpu_high, 85.0);
        assert_eq!(config.log_patterns.rules.len(), 1);
        assert_eq!(
            config.log_patterns.rules[0].remediation,
            RemediationAction::RestartContainer
        );
    }

    #[test]
    fn test_zero_max_attempts_rejected() {
        let yaml = "restart:\n  max_attempts: 0\n";
        let err = HooksConfig::from_yaml_str(yaml).unwrap_err();
        assert!(err.to_string().contains("max_attempts"));
    }

    #[test]
    fn test_inverted_watermarks_rejected() {
        let yaml = "scaling:\n  cpu_high: 10.0\n  cpu_low: 50.0\n";
        let err = HooksConfig::from_yaml_str(yaml).unwrap_err();
        assert!(err.to_string().contains("cpu_low"));
    }

    #[test]
    fn test_bad_pattern_rejected() {
        let yaml = r#"
log_patterns:
  rules:
    - name: broken
      pattern: "([unclosed"
      severity: warning
      remediation: notify_only
"#;
        let err = HooksConfig::from_yaml_str(yaml).unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn test_retry_policy_derivation() {
        let settings = HookSettings {
            max_attempts: 2,
            cooldown_seconds: 90,
            excluded_targets: vec!["db".to_string()],
            ..HookSettings::default()
        };
        let policy = settings.retry_policy();
        assert_eq!(policy.max_attempts, 2);
        assert_eq!(policy.cooldown, Duration::from_secs(90));
        assert!(policy.excluded_targets.contains("db"));
    }
}
