//! Log pattern hook
//!
//! Reacts to `container_log` events, matching each line against configured
//! regex rules. Notify-only rules report the match; a rule whose
//! remediation is `restart_container` goes through the same per-target
//! ledger and runtime as the restart hook, so a noisy log line can never
//! restart a container more often than the cooldown and attempt limits
//! allow.

use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, error, info, warn};

use crate::config::{
    HookSettings, LogPatternHookConfig, LogPatternRule, PatternSeverity, RemediationAction,
};
use crate::error::{HookError, Result};
use crate::hook::Hook;
use crate::retry::{AttemptGate, RemediationOutcome, TargetLedger};
use crate::runtime::{ContainerRuntime, ContainerStatus};
use crate::types::{HookContext, HookResult, CONTAINER_LOG_EVENT_NAME, CUSTOM_EVENT};

/// Registry id of the log pattern hook
pub const LOG_PATTERN_HOOK_ID: &str = "log-pattern";

struct CompiledRule {
    rule: LogPatternRule,
    regex: Regex,
}

/// Matches container log lines against remediation rules
pub struct LogPatternHook {
    config: LogPatternHookConfig,
    rules: Vec<CompiledRule>,
    ledger: TargetLedger,
    runtime: Arc<dyn ContainerRuntime>,
}

impl LogPatternHook {
    /// Create a log pattern hook; rule patterns are compiled up front
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` when a rule pattern does not compile.
    pub fn new(config: LogPatternHookConfig, runtime: Arc<dyn ContainerRuntime>) -> Result<Self> {
        let mut rules = Vec::with_capacity(config.rules.len());
        for rule in &config.rules {
            let regex = Regex::new(&rule.pattern).map_err(|e| {
                HookError::InvalidConfiguration(format!(
                    "rule '{}' has an invalid pattern: {e}",
                    rule.name
                ))
            })?;
            rules.push(CompiledRule {
                rule: rule.clone(),
                regex,
            });
        }
        let ledger = TargetLedger::new(config.settings.retry_policy());
        Ok(Self {
            config,
            rules,
            ledger,
            runtime,
        })
    }

    /// Operator escape hatch: clear attempts and cooldown for a target
    pub fn reset_target(&self, target: &str) {
        self.ledger.reset(target);
    }

    fn is_log_event(ctx: &HookContext) -> bool {
        ctx.event_type() == CUSTOM_EVENT && ctx.event_name() == Some(CONTAINER_LOG_EVENT_NAME)
    }

    fn matching_rules(&self, line: &str) -> Vec<&CompiledRule> {
        self.rules
            .iter()
            .filter(|compiled| compiled.regex.is_match(line))
            .collect()
    }

    fn report_match(&self, rule: &LogPatternRule, target: Option<&str>, line: &str) {
        match rule.severity {
            PatternSeverity::Critical => error!(
                rule = %rule.name,
                target = ?target,
                line = %line,
                "Critical log pattern matched"
            ),
            PatternSeverity::Warning => warn!(
                rule = %rule.name,
                target = ?target,
                line = %line,
                "Log pattern matched"
            ),
            PatternSeverity::Info => info!(
                rule = %rule.name,
                target = ?target,
                line = %line,
                "Log pattern matched"
            ),
        }
    }

    async fn restart_for_rule(
        &self,
        rule_name: &str,
        target: &str,
        result: HookResult,
    ) -> HookResult {
        if !self.ledger.begin_attempt(target) {
            return HookResult {
                success: false,
                ..result
            }
            .with_suggestion(format!(
                "restart for rule '{rule_name}' skipped: attempt gate closed for '{target}'"
            ));
        }
        let attempt = self.ledger.attempts(target);
        info!(
            target = %target,
            rule = %rule_name,
            attempt = attempt,
            "Restarting container for matched log pattern"
        );

        if let Err(e) = self.runtime.restart(target).await {
            self.ledger.record_outcome(target, RemediationOutcome::Failed);
            return HookResult {
                success: false,
                ..result
            }
            .with_error(e)
            .with_metric("attempts", serde_json::json!(attempt));
        }

        let result = result
            .with_action(format!("restarted container '{target}' (rule '{rule_name}')"))
            .with_metric("attempts", serde_json::json!(attempt));
        match self.runtime.status(target).await {
            Ok(ContainerStatus::Running) => {
                self.ledger
                    .record_outcome(target, RemediationOutcome::Succeeded);
                result
            }
            Ok(status) => {
                self.ledger
                    .record_outcome(target, RemediationOutcome::Degraded);
                HookResult {
                    success: false,
                    ..result
                }
                .with_suggestion(format!("container '{target}' is {status:?} after restart"))
            }
            Err(e) => {
                self.ledger
                    .record_outcome(target, RemediationOutcome::Degraded);
                HookResult {
                    success: false,
                    ..result
                }
                .with_error(e)
            }
        }
    }
}

#[async_trait]
impl Hook for LogPatternHook {
    fn id(&self) -> &str {
        LOG_PATTERN_HOOK_ID
    }

    fn settings(&self) -> &HookSettings {
        &self.config.settings
    }

    fn should_execute(&self, ctx: &HookContext) -> bool {
        if !self.config.settings.enabled {
            return false;
        }
        if !Self::is_log_event(ctx) {
            return false;
        }
        let Some(line) = ctx.log_line() else {
            return false;
        };
        let matched = self.matching_rules(line);
        if matched.is_empty() {
            return false;
        }

        let wants_restart = matched
            .iter()
            .any(|c| c.rule.remediation == RemediationAction::RestartContainer);
        if !wants_restart {
            // Notify-only matches always execute (to report).
            return true;
        }
        match ctx.container_target() {
            Some(target) => match self.ledger.check(&target) {
                AttemptGate::Allow => true,
                AttemptGate::Exhausted { attempts } => {
                    info!(
                        target = %target,
                        attempts = attempts,
                        "Max log-pattern restarts reached, awaiting operator reset"
                    );
                    // Still worth executing when a notify-only rule matched too.
                    matched
                        .iter()
                        .any(|c| c.rule.remediation == RemediationAction::NotifyOnly)
                }
                gate => {
                    debug!(target = %target, gate = ?gate, "Log-pattern restart gated");
                    matched
                        .iter()
                        .any(|c| c.rule.remediation == RemediationAction::NotifyOnly)
                }
            },
            None => {
                debug!("Log event carries no container target, notify only");
                true
            }
        }
    }

    async fn execute(&self, ctx: &HookContext) -> HookResult {
        let Some(line) = ctx.log_line() else {
            return HookResult::failure("log event carries no log line");
        };
        let target = ctx.container_target();
        let matched = self.matching_rules(line);
        if matched.is_empty() {
            return HookResult::failure("no log pattern matched");
        }

        let mut result = HookResult::success(format!(
            "{} log pattern(s) matched",
            matched.len()
        ))
        .with_metric(
            "matched_rules",
            serde_json::json!(matched
                .iter()
                .map(|c| c.rule.name.clone())
                .collect::<Vec<_>>()),
        );

        for compiled in &matched {
            self.report_match(&compiled.rule, target.as_deref(), line);
            result = result.with_action(format!(
                "reported match of rule '{}' ({:?})",
                compiled.rule.name, compiled.rule.severity
            ));
        }

        // At most one restart per event: the highest-severity restart rule.
        let actionable = matched
            .iter()
            .filter(|c| c.rule.remediation == RemediationAction::RestartContainer)
            .max_by_key(|c| c.rule.severity);
        let Some(actionable) = actionable else {
            return result;
        };
        let Some(target) = target else {
            return HookResult {
                success: false,
                ..result
            }
            .with_suggestion("restart rule matched but the event names no container");
        };
        self.restart_for_rule(&actionable.rule.name, &target, result)
            .await
    }
}
