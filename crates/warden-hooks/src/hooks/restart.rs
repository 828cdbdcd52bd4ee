//! Container restart hook
//!
//! Reacts to `service_health` events for `container:<name>` components.
//! Each attempt walks the full state machine: claim the attempt (counter +
//! cooldown clock) before acting, restart through the runtime, wait, then
//! verify with a health inspection. The attempt counter resets only on a
//! verified recovery; a restart that "worked" but left the container
//! unhealthy keeps burning attempts until the target goes terminal and an
//! operator resets it.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::{HookSettings, RestartHookConfig};
use crate::hook::Hook;
use crate::retry::{AttemptGate, RemediationOutcome, TargetLedger};
use crate::runtime::{ContainerRuntime, ContainerStatus, HealthState};
use crate::types::{HookContext, HookResult, SERVICE_HEALTH_EVENT};

/// Registry id of the restart hook
pub const RESTART_HOOK_ID: &str = "container-restart";

/// Restarts unhealthy containers, bounded by the per-target ledger
pub struct ContainerRestartHook {
    config: RestartHookConfig,
    ledger: TargetLedger,
    runtime: Arc<dyn ContainerRuntime>,
}

impl ContainerRestartHook {
    /// Create a restart hook over a container runtime
    pub fn new(config: RestartHookConfig, runtime: Arc<dyn ContainerRuntime>) -> Self {
        let ledger = TargetLedger::new(config.settings.retry_policy());
        Self {
            config,
            ledger,
            runtime,
        }
    }

    /// Operator escape hatch: clear attempts and cooldown for a target
    pub fn reset_target(&self, target: &str) {
        self.ledger.reset(target);
    }

    /// Attempts consumed by a target
    pub fn attempts(&self, target: &str) -> u32 {
        self.ledger.attempts(target)
    }

    /// Targets that reached `max_attempts` and await an operator reset
    pub fn exhausted_targets(&self) -> Vec<String> {
        self.ledger.exhausted_targets()
    }

    fn is_unhealthy(&self, status: &str) -> bool {
        self.config
            .unhealthy_statuses
            .iter()
            .any(|s| s.eq_ignore_ascii_case(status))
    }

    /// Post-restart verification
    ///
    /// Healthy means verified. A container without a health check falls
    /// back to its lifecycle status: running is the best confirmation
    /// available.
    async fn verify(&self, target: &str) -> (RemediationOutcome, String) {
        tokio::time::sleep(self.config.verify_delay()).await;
        match self.runtime.inspect_health(target).await {
            Ok(HealthState::Healthy) => (
                RemediationOutcome::Succeeded,
                format!("container '{target}' is healthy after restart"),
            ),
            Ok(HealthState::NoHealthCheck) => match self.runtime.status(target).await {
                Ok(ContainerStatus::Running) => (
                    RemediationOutcome::Succeeded,
                    format!("container '{target}' is running after restart (no health check)"),
                ),
                Ok(status) => (
                    RemediationOutcome::Degraded,
                    format!("container '{target}' restarted but is {status:?}"),
                ),
                Err(e) => (
                    RemediationOutcome::Degraded,
                    format!("container '{target}' restarted but status is unverifiable: {e}"),
                ),
            },
            Ok(state) => (
                RemediationOutcome::Degraded,
                format!("container '{target}' restarted but health is {state:?}"),
            ),
            Err(e) => (
                RemediationOutcome::Degraded,
                format!("container '{target}' restarted but health is unverifiable: {e}"),
            ),
        }
    }
}

#[async_trait]
impl Hook for ContainerRestartHook {
    fn id(&self) -> &str {
        RESTART_HOOK_ID
    }

    fn settings(&self) -> &HookSettings {
        &self.config.settings
    }

    fn should_execute(&self, ctx: &HookContext) -> bool {
        if !self.config.settings.enabled {
            return false;
        }
        if ctx.event_type() != SERVICE_HEALTH_EVENT {
            return false;
        }
        let Some(target) = ctx.container_target() else {
            return false;
        };
        let Some(status) = ctx.status() else {
            return false;
        };
        if !self.is_unhealthy(status) {
            return false;
        }
        self.ledger.cache_status(&target, status);

        match self.ledger.check(&target) {
            AttemptGate::Allow => true,
            AttemptGate::Exhausted { attempts } => {
                // Deliberate terminal state against flapping loops; only an
                // operator reset reopens the target.
                info!(
                    target = %target,
                    attempts = attempts,
                    "Max restart attempts reached, awaiting operator reset"
                );
                false
            }
            gate => {
                debug!(target = %target, gate = ?gate, "Restart gated");
                false
            }
        }
    }

    async fn execute(&self, ctx: &HookContext) -> HookResult {
        let Some(target) = ctx.container_target() else {
            return HookResult::failure("health event carries no container target");
        };

        if !self.ledger.begin_attempt(&target) {
            // A concurrent execution claimed the attempt first.
            return HookResult::failure(format!(
                "restart of '{target}' skipped: attempt gate closed"
            ))
            .with_suggestion("another attempt is in flight or limits apply");
        }
        let attempt = self.ledger.attempts(&target);
        info!(target = %target, attempt = attempt, "Restarting unhealthy container");

        if let Err(e) = self.runtime.restart(&target).await {
            self.ledger.record_outcome(&target, RemediationOutcome::Failed);
            warn!(target = %target, error = %e, "Container restart failed");
            return HookResult::failure(format!("restart of '{target}' failed"))
                .with_error(e)
                .with_suggestion("verify the container runtime is reachable")
                .with_metric("attempts", serde_json::json!(attempt));
        }

        let (outcome, detail) = self.verify(&target).await;
        self.ledger.record_outcome(&target, outcome);

        let result = match outcome {
            RemediationOutcome::Succeeded => HookResult::success(detail),
            _ => HookResult::failure(detail)
                .with_suggestion(format!("inspect logs of container '{target}'")),
        };
        result
            .with_action(format!("restarted container '{target}'"))
            .with_metric("attempts", serde_json::json!(attempt))
            .with_metric("outcome", serde_json::json!(format!("{outcome:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{HookError, Result};
    use crate::runtime::ResourceLimits;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use warden_events::Event;

    struct FakeRuntime {
        restarts: AtomicUsize,
        fail_restart: bool,
        health: Mutex<HealthState>,
    }

    impl FakeRuntime {
        fn healthy_after_restart() -> Arc<Self> {
            Arc::new(Self {
                restarts: AtomicUsize::new(0),
                fail_restart: false,
                health: Mutex::new(HealthState::Healthy),
            })
        }

        fn still_unhealthy() -> Arc<Self> {
            Arc::new(Self {
                restarts: AtomicUsize::new(0),
                fail_restart: false,
                health: Mutex::new(HealthState::Unhealthy),
            })
        }

        fn broken() -> Arc<Self> {
            Arc::new(Self {
                restarts: AtomicUsize::new(0),
                fail_restart: true,
                health: Mutex::new(HealthState::Unhealthy),
            })
        }
    }

    #[async_trait]
    impl ContainerRuntime for FakeRuntime {
        async fn status(&self, _target: &str) -> Result<ContainerStatus> {
            Ok(ContainerStatus::Running)
        }

        async fn restart(&self, target: &str) -> Result<()> {
            if self.fail_restart {
                return Err(HookError::CommandFailed {
                    command: format!("restart {target}"),
                    code: Some(1),
                    stderr: "no such container".to_string(),
                });
            }
            self.restarts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn inspect_health(&self, _target: &str) -> Result<HealthState> {
            Ok(self.health.lock().unwrap().clone())
        }

        async fn update_limits(&self, _target: &str, _limits: &ResourceLimits) -> Result<()> {
            Ok(())
        }
    }

    fn config(max_attempts: u32, cooldown_seconds: u64) -> RestartHookConfig {
        RestartHookConfig {
            settings: HookSettings {
                max_attempts,
                cooldown_seconds,
                ..HookSettings::default()
            },
            verify_delay_ms: 0,
            ..RestartHookConfig::default()
        }
    }

    fn unhealthy_event(name: &str) -> HookContext {
        HookContext::new(Arc::new(
            Event::new(SERVICE_HEALTH_EVENT, "container_monitor")
                .with_data("component", serde_json::json!(format!("container:{name}")))
                .with_data("status", serde_json::json!("unhealthy")),
        ))
    }

    #[test]
    fn test_should_execute_trigger_shape() {
        let hook = ContainerRestartHook::new(config(3, 0), FakeRuntime::healthy_after_restart());

        assert!(hook.should_execute(&unhealthy_event("web")));

        let wrong_type = HookContext::new(Arc::new(
            Event::new("resource_usage", "monitor")
                .with_data("component", serde_json::json!("container:web"))
                .with_data("status", serde_json::json!("unhealthy")),
        ));
        assert!(!hook.should_execute(&wrong_type));

        let healthy = HookContext::new(Arc::new(
            Event::new(SERVICE_HEALTH_EVENT, "monitor")
                .with_data("component", serde_json::json!("container:web"))
                .with_data("status", serde_json::json!("healthy")),
        ));
        assert!(!hook.should_execute(&healthy));

        let not_a_container = HookContext::new(Arc::new(
            Event::new(SERVICE_HEALTH_EVENT, "monitor")
                .with_data("component", serde_json::json!("host:db-1"))
                .with_data("status", serde_json::json!("unhealthy")),
        ));
        assert!(!hook.should_execute(&not_a_container));
    }

    #[test]
    fn test_disabled_hook_declines() {
        let mut cfg = config(3, 0);
        cfg.settings.enabled = false;
        let hook = ContainerRestartHook::new(cfg, FakeRuntime::healthy_after_restart());
        assert!(!hook.should_execute(&unhealthy_event("web")));
    }

    #[test]
    fn test_excluded_target_never_leaves_idle() {
        let mut cfg = config(3, 0);
        cfg.settings.excluded_targets = vec!["web".to_string()];
        let hook = ContainerRestartHook::new(cfg, FakeRuntime::healthy_after_restart());
        assert!(!hook.should_execute(&unhealthy_event("web")));
        assert_eq!(hook.attempts("web"), 0);
    }

    #[tokio::test]
    async fn test_successful_restart_resets_attempts() {
        let runtime = FakeRuntime::healthy_after_restart();
        let hook = ContainerRestartHook::new(config(3, 0), runtime.clone());

        let result = hook.execute(&unhealthy_event("web")).await;
        assert!(result.success);
        assert_eq!(runtime.restarts.load(Ordering::SeqCst), 1);
        assert_eq!(hook.attempts("web"), 0);
        assert!(result.actions_taken[0].contains("restarted"));
    }

    #[tokio::test]
    async fn test_degraded_restart_keeps_attempts() {
        let runtime = FakeRuntime::still_unhealthy();
        let hook = ContainerRestartHook::new(config(3, 0), runtime.clone());

        let result = hook.execute(&unhealthy_event("web")).await;
        assert!(!result.success);
        assert!(result.message.contains("health"));
        assert_eq!(runtime.restarts.load(Ordering::SeqCst), 1);
        assert_eq!(hook.attempts("web"), 1);
    }

    #[tokio::test]
    async fn test_failed_restart_keeps_attempts_and_captures_error() {
        let hook = ContainerRestartHook::new(config(3, 0), FakeRuntime::broken());

        let result = hook.execute(&unhealthy_event("web")).await;
        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().contains("no such container"));
        assert_eq!(hook.attempts("web"), 1);
    }

    #[tokio::test]
    async fn test_max_attempts_terminal_until_reset() {
        let runtime = FakeRuntime::still_unhealthy();
        let hook = ContainerRestartHook::new(config(3, 0), runtime.clone());

        for _ in 0..3 {
            assert!(hook.should_execute(&unhealthy_event("web")));
            let result = hook.execute(&unhealthy_event("web")).await;
            assert!(!result.success);
        }
        assert_eq!(hook.attempts("web"), 3);
        assert!(!hook.should_execute(&unhealthy_event("web")));
        assert_eq!(hook.exhausted_targets(), vec!["web".to_string()]);

        hook.reset_target("web");
        assert!(hook.should_execute(&unhealthy_event("web")));
    }

    #[tokio::test]
    async fn test_cooldown_gates_back_to_back_events() {
        let runtime = FakeRuntime::still_unhealthy();
        let hook = ContainerRestartHook::new(config(3, 60), runtime.clone());

        assert!(hook.should_execute(&unhealthy_event("web")));
        let _ = hook.execute(&unhealthy_event("web")).await;
        // Same target within the cooldown window: skipped.
        assert!(!hook.should_execute(&unhealthy_event("web")));
        // A different target has its own budget.
        assert!(hook.should_execute(&unhealthy_event("api")));
    }
}
