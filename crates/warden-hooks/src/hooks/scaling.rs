//! Resource scaling hook
//!
//! Reacts to `resource_usage` events carrying `container.<metric>` values.
//! Samples accumulate in a bounded per-target observation buffer; only a
//! breach sustained across the whole observation window (and enough
//! samples) drives a limits update. Single spikes never scale anything.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::{HookSettings, ScalingHookConfig};
use crate::hook::Hook;
use crate::retry::{AttemptGate, RemediationOutcome, TargetLedger};
use crate::runtime::{ContainerRuntime, ContainerStatus, ResourceLimits};
use crate::types::{HookContext, HookResult, RESOURCE_USAGE_EVENT};

/// Registry id of the scaling hook
pub const SCALING_HOOK_ID: &str = "resource-scaling";

const MAX_SAMPLES_PER_SERIES: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum MetricKind {
    Cpu,
    Memory,
}

impl MetricKind {
    /// `container.cpu`, `container.cpu_percent`, `container.memory`, ...
    fn parse(metric_name: &str) -> Option<Self> {
        let suffix = metric_name.strip_prefix("container.")?;
        if suffix.starts_with("cpu") {
            Some(MetricKind::Cpu)
        } else if suffix.starts_with("mem") {
            Some(MetricKind::Memory)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScaleDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    at: Instant,
    value: f64,
}

/// Adjusts container resource limits on sustained watermark breaches
pub struct ResourceScalingHook {
    config: ScalingHookConfig,
    ledger: TargetLedger,
    runtime: Arc<dyn ContainerRuntime>,
    observations: Mutex<HashMap<(String, MetricKind), VecDeque<Sample>>>,
}

impl ResourceScalingHook {
    /// Create a scaling hook over a container runtime
    pub fn new(config: ScalingHookConfig, runtime: Arc<dyn ContainerRuntime>) -> Self {
        let ledger = TargetLedger::new(config.settings.retry_policy());
        Self {
            config,
            ledger,
            runtime,
            observations: Mutex::new(HashMap::new()),
        }
    }

    /// Operator escape hatch: clear attempts and cooldown for a target
    pub fn reset_target(&self, target: &str) {
        self.ledger.reset(target);
    }

    fn record_observation(&self, target: &str, kind: MetricKind, value: f64) {
        let mut observations = self
            .observations
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let series = observations
            .entry((target.to_string(), kind))
            .or_insert_with(VecDeque::new);
        series.push_back(Sample {
            at: Instant::now(),
            value,
        });
        let cutoff = Instant::now().checked_sub(self.config.observation_window());
        while let Some(front) = series.front() {
            let expired = cutoff.map(|c| front.at < c).unwrap_or(false);
            if expired || series.len() > MAX_SAMPLES_PER_SERIES {
                series.pop_front();
            } else {
                break;
            }
        }
    }

    /// A breach counts only when every sample in the window is beyond the
    /// watermark and enough samples were seen
    fn sustained_breach(&self, target: &str, kind: MetricKind) -> Option<ScaleDirection> {
        let observations = self
            .observations
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let series = observations.get(&(target.to_string(), kind))?;
        if series.len() < self.config.min_samples {
            return None;
        }
        let (high, low) = match kind {
            MetricKind::Cpu => (self.config.cpu_high, self.config.cpu_low),
            MetricKind::Memory => (self.config.memory_high, self.config.memory_low),
        };
        if series.iter().all(|s| s.value >= high) {
            Some(ScaleDirection::Up)
        } else if series.iter().all(|s| s.value <= low) {
            Some(ScaleDirection::Down)
        } else {
            None
        }
    }

    fn clear_series(&self, target: &str, kind: MetricKind) {
        self.observations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&(target.to_string(), kind));
    }

    fn limits_for(&self, direction: ScaleDirection) -> ResourceLimits {
        match direction {
            ScaleDirection::Up => ResourceLimits {
                cpus: Some(self.config.scale_up_cpus),
                memory_mb: Some(self.config.scale_up_memory_mb),
            },
            ScaleDirection::Down => ResourceLimits {
                cpus: Some(self.config.scale_down_cpus),
                memory_mb: Some(self.config.scale_down_memory_mb),
            },
        }
    }

    fn reading(ctx: &HookContext) -> Option<(String, MetricKind, f64)> {
        let kind = MetricKind::parse(ctx.metric_name()?)?;
        let target = ctx.metric_tag("container_name")?.to_string();
        let value = ctx.metric_value()?;
        Some((target, kind, value))
    }
}

#[async_trait]
impl Hook for ResourceScalingHook {
    fn id(&self) -> &str {
        SCALING_HOOK_ID
    }

    fn settings(&self) -> &HookSettings {
        &self.config.settings
    }

    fn should_execute(&self, ctx: &HookContext) -> bool {
        if !self.config.settings.enabled {
            return false;
        }
        if ctx.event_type() != RESOURCE_USAGE_EVENT {
            return false;
        }
        let Some((target, kind, value)) = Self::reading(ctx) else {
            return false;
        };
        // Observation buffers are internal state, not remediation.
        self.record_observation(&target, kind, value);

        let Some(direction) = self.sustained_breach(&target, kind) else {
            return false;
        };
        match self.ledger.check(&target) {
            AttemptGate::Allow => {
                debug!(
                    target = %target,
                    metric = ?kind,
                    direction = ?direction,
                    "Sustained watermark breach"
                );
                true
            }
            AttemptGate::Exhausted { attempts } => {
                info!(
                    target = %target,
                    attempts = attempts,
                    "Max scaling attempts reached, awaiting operator reset"
                );
                false
            }
            gate => {
                debug!(target = %target, gate = ?gate, "Scaling gated");
                false
            }
        }
    }

    async fn execute(&self, ctx: &HookContext) -> HookResult {
        let Some((target, kind, _)) = Self::reading(ctx) else {
            return HookResult::failure("resource event carries no usable container reading");
        };
        let Some(direction) = self.sustained_breach(&target, kind) else {
            return HookResult::failure(format!(
                "breach for '{target}' no longer sustained, nothing to do"
            ));
        };
        if !self.ledger.begin_attempt(&target) {
            return HookResult::failure(format!(
                "scaling of '{target}' skipped: attempt gate closed"
            ));
        }
        let attempt = self.ledger.attempts(&target);
        let limits = self.limits_for(direction);
        info!(
            target = %target,
            direction = ?direction,
            cpus = ?limits.cpus,
            memory_mb = ?limits.memory_mb,
            attempt = attempt,
            "Updating container resource limits"
        );

        if let Err(e) = self.runtime.update_limits(&target, &limits).await {
            self.ledger.record_outcome(&target, RemediationOutcome::Failed);
            warn!(target = %target, error = %e, "Resource limit update failed");
            return HookResult::failure(format!("limit update for '{target}' failed"))
                .with_error(e)
                .with_metric("attempts", serde_json::json!(attempt));
        }

        let action = format!(
            "updated limits of '{target}' (cpus: {:?}, memory_mb: {:?})",
            limits.cpus, limits.memory_mb
        );
        match self.runtime.status(&target).await {
            Ok(ContainerStatus::Running) => {
                self.ledger
                    .record_outcome(&target, RemediationOutcome::Succeeded);
                // A stale breach must not refire on the next sample.
                self.clear_series(&target, kind);
                HookResult::success(format!("scaled '{target}' {direction:?}"))
                    .with_action(action)
                    .with_metric("attempts", serde_json::json!(attempt))
            }
            Ok(status) => {
                self.ledger
                    .record_outcome(&target, RemediationOutcome::Degraded);
                HookResult::failure(format!(
                    "limits of '{target}' updated but container is {status:?}"
                ))
                .with_action(action)
                .with_suggestion(format!("inspect container '{target}'"))
            }
            Err(e) => {
                self.ledger
                    .record_outcome(&target, RemediationOutcome::Degraded);
                HookResult::failure(format!(
                    "limits of '{target}' updated but status is unverifiable"
                ))
                .with_action(action)
                .with_error(e)
            }
        }
    }
}
