//! Container runtime client
//!
//! Narrow seam between hooks and the container runtime: status queries,
//! restarts, health inspection, and resource limit updates. The CLI
//! implementation probes `docker` then `podman` in priority order and wraps
//! every call in an explicit timeout. An expired deadline surfaces as
//! [`HookError::Timeout`], which hooks treat as a FAILED remediation
//! outcome, never an open-ended block.
//!
//! Hook logic is tested against in-memory fakes of [`ContainerRuntime`];
//! no test touches a real runtime.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::error::{HookError, Result};

/// Lifecycle status of a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerStatus {
    Running,
    Restarting,
    Paused,
    Exited,
    /// Anything the runtime reported that we don't model
    Unknown(String),
}

impl ContainerStatus {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "running" => ContainerStatus::Running,
            "restarting" => ContainerStatus::Restarting,
            "paused" => ContainerStatus::Paused,
            "exited" | "dead" => ContainerStatus::Exited,
            other => ContainerStatus::Unknown(other.to_string()),
        }
    }
}

/// Health-check verdict for a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthState {
    Healthy,
    Unhealthy,
    Starting,
    /// The container defines no health check
    NoHealthCheck,
    Unknown(String),
}

impl HealthState {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "healthy" => HealthState::Healthy,
            "unhealthy" => HealthState::Unhealthy,
            "starting" => HealthState::Starting,
            other => HealthState::Unknown(other.to_string()),
        }
    }
}

/// Resource limits applied through `update_limits`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceLimits {
    /// CPU limit in cores
    pub cpus: Option<f64>,
    /// Memory limit in MiB
    pub memory_mb: Option<u64>,
}

/// Operations hooks need from a container runtime
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Lifecycle status of a container
    async fn status(&self, target: &str) -> Result<ContainerStatus>;

    /// Restart a container
    async fn restart(&self, target: &str) -> Result<()>;

    /// Health-check verdict for a container
    async fn inspect_health(&self, target: &str) -> Result<HealthState>;

    /// Apply new resource limits to a container
    async fn update_limits(&self, target: &str, limits: &ResourceLimits) -> Result<()>;
}

/// CLI-backed runtime client probing `docker` then `podman`
pub struct CliContainerRuntime {
    candidates: Vec<String>,
    command_timeout: Duration,
    binary: OnceCell<String>,
}

impl CliContainerRuntime {
    /// Create a client with the default probe order (`docker`, `podman`)
    pub fn new(command_timeout: Duration) -> Self {
        Self::with_candidates(
            vec!["docker".to_string(), "podman".to_string()],
            command_timeout,
        )
    }

    /// Create a client with an explicit probe order
    pub fn with_candidates(candidates: Vec<String>, command_timeout: Duration) -> Self {
        Self {
            candidates,
            command_timeout,
            binary: OnceCell::new(),
        }
    }

    /// The runtime binary, detected once and cached
    async fn binary(&self) -> Result<&str> {
        self.binary
            .get_or_try_init(|| async {
                for candidate in &self.candidates {
                    match self.run(candidate, &["--version"]).await {
                        Ok(version) => {
                            info!(binary = %candidate, version = %version, "Container runtime detected");
                            return Ok(candidate.clone());
                        }
                        Err(e) => {
                            debug!(binary = %candidate, error = %e, "Runtime probe failed");
                        }
                    }
                }
                Err(HookError::RuntimeUnavailable {
                    probed: self.candidates.join(", "),
                })
            })
            .await
            .map(String::as_str)
    }

    /// Run one runtime command under the configured deadline
    async fn run(&self, binary: &str, args: &[&str]) -> Result<String> {
        let rendered = format!("{} {}", binary, args.join(" "));
        debug!(command = %rendered, "Running runtime command");

        let mut command = tokio::process::Command::new(binary);
        command.args(args).kill_on_drop(true);

        let output = tokio::time::timeout(self.command_timeout, command.output())
            .await
            .map_err(|_| {
                warn!(command = %rendered, "Runtime command timed out");
                HookError::Timeout {
                    command: rendered.clone(),
                    timeout_ms: self.command_timeout.as_millis() as u64,
                }
            })?
            .map_err(|e| HookError::CommandFailed {
                command: rendered.clone(),
                code: None,
                stderr: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(HookError::CommandFailed {
                command: rendered,
                code: output.status.code(),
                stderr,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl ContainerRuntime for CliContainerRuntime {
    async fn status(&self, target: &str) -> Result<ContainerStatus> {
        let binary = self.binary().await?;
        let raw = self
            .run(binary, &["inspect", "--format", "{{.State.Status}}", target])
            .await?;
        Ok(ContainerStatus::parse(&raw))
    }

    async fn restart(&self, target: &str) -> Result<()> {
        let binary = self.binary().await?;
        self.run(binary, &["restart", target]).await?;
        Ok(())
    }

    async fn inspect_health(&self, target: &str) -> Result<HealthState> {
        let binary = self.binary().await?;
        let raw = self
            .run(
                binary,
                &["inspect", "--format", "{{json .State.Health}}", target],
            )
            .await?;
        if raw.is_empty() || raw == "null" {
            return Ok(HealthState::NoHealthCheck);
        }
        let parsed: serde_json::Value = serde_json::from_str(&raw)?;
        match parsed.get("Status").and_then(|s| s.as_str()) {
            Some(status) => Ok(HealthState::parse(status)),
            None => Ok(HealthState::Unknown(raw)),
        }
    }

    async fn update_limits(&self, target: &str, limits: &ResourceLimits) -> Result<()> {
        if limits.cpus.is_none() && limits.memory_mb.is_none() {
            return Err(HookError::InvalidConfiguration(
                "update_limits requires at least one limit".to_string(),
            ));
        }
        let binary = self.binary().await?;
        let mut args = vec!["update".to_string()];
        if let Some(cpus) = limits.cpus {
            args.push("--cpus".to_string());
            args.push(cpus.to_string());
        }
        if let Some(memory_mb) = limits.memory_mb {
            args.push("--memory".to_string());
            args.push(format!("{memory_mb}m"));
        }
        args.push(target.to_string());
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run(binary, &arg_refs).await?;
        Ok(())
    }
}
