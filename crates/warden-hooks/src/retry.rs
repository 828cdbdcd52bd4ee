//! Per-target retry/cooldown/exclusion ledger
//!
//! Every hook instance owns one [`TargetLedger`], keyed by remediation
//! target (a container name). The ledger is the mechanism that serializes
//! effective remediation attempts for one target: `should_execute` reads the
//! gate through [`TargetLedger::check`], and `execute` enters through
//! [`TargetLedger::begin_attempt`], which re-checks and claims the attempt
//! under one lock, closing the check-then-act race between concurrent
//! executions for the same target.
//!
//! The attempt counter and the cooldown clock are independent: a successful
//! remediation resets attempts to zero but leaves `last_action` in place, so
//! cooldown stays purely time-based. The clock is stamped at the *start* of
//! an attempt, before the remediation runs, so a slow failing attempt cannot
//! let the cooldown expire mid-flight.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, info};

/// Limits applied per remediation target
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts allowed before the target becomes terminal
    pub max_attempts: u32,
    /// Minimum time between two attempts for the same target
    pub cooldown: Duration,
    /// Targets that never leave IDLE regardless of event content
    pub excluded_targets: HashSet<String>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            cooldown: Duration::from_secs(60),
            excluded_targets: HashSet::new(),
        }
    }
}

/// Terminal classification of one remediation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemediationOutcome {
    /// The action worked and post-action verification confirmed the desired
    /// end state; the attempt counter resets
    Succeeded,
    /// The action worked but verification failed; attempts are kept
    Degraded,
    /// The action itself could not be performed or timed out; attempts are
    /// kept
    Failed,
}

/// Why a target may or may not be acted on right now
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptGate {
    /// The target may be acted on
    Allow,
    /// The target is statically excluded
    Excluded,
    /// `max_attempts` reached; terminal until an operator reset
    Exhausted { attempts: u32 },
    /// Inside the cooldown window of the previous attempt
    CoolingDown { remaining: Duration },
}

#[derive(Default)]
struct LedgerState {
    attempts: HashMap<String, u32>,
    last_action: HashMap<String, Instant>,
    status_cache: HashMap<String, String>,
}

/// Attempt/cooldown/status bookkeeping for one hook instance
pub struct TargetLedger {
    policy: RetryPolicy,
    state: Mutex<LedgerState>,
}

impl TargetLedger {
    /// Create a ledger enforcing `policy`
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            state: Mutex::new(LedgerState::default()),
        }
    }

    /// The policy this ledger enforces
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Evaluate the gate for a target without claiming an attempt
    ///
    /// Checked in precedence order: exclusion, exhaustion (regardless of
    /// elapsed cooldown), cooldown.
    pub fn check(&self, target: &str) -> AttemptGate {
        let state = self.lock();
        self.gate(&state, target)
    }

    /// Atomically re-check the gate and claim an attempt
    ///
    /// On `Allow`, increments the attempt counter and stamps the cooldown
    /// clock *before* the remediation runs, so a crash mid-remediation
    /// still counts toward both limits. Returns `false` when the gate is
    /// closed, including when a concurrent attempt claimed it first.
    pub fn begin_attempt(&self, target: &str) -> bool {
        let mut state = self.lock();
        if self.gate(&state, target) != AttemptGate::Allow {
            return false;
        }
        *state.attempts.entry(target.to_string()).or_insert(0) += 1;
        state.last_action.insert(target.to_string(), Instant::now());
        debug!(
            target = %target,
            attempts = state.attempts[target],
            "Attempt claimed"
        );
        true
    }

    /// Record how an attempt ended
    ///
    /// Only `Succeeded` resets the attempt counter; the cooldown clock is
    /// never touched here.
    pub fn record_outcome(&self, target: &str, outcome: RemediationOutcome) {
        if outcome == RemediationOutcome::Succeeded {
            let mut state = self.lock();
            state.attempts.remove(target);
            debug!(target = %target, "Attempt counter reset after success");
        }
    }

    /// Cache the last observed status of a target
    pub fn cache_status(&self, target: &str, status: impl Into<String>) {
        self.lock()
            .status_cache
            .insert(target.to_string(), status.into());
    }

    /// Last cached status of a target
    pub fn cached_status(&self, target: &str) -> Option<String> {
        self.lock().status_cache.get(target).cloned()
    }

    /// Attempts consumed by a target
    pub fn attempts(&self, target: &str) -> u32 {
        self.lock().attempts.get(target).copied().unwrap_or(0)
    }

    /// Operator escape hatch: clear attempts and cooldown for a target
    ///
    /// This is the only way an exhausted target becomes eligible again.
    pub fn reset(&self, target: &str) {
        let mut state = self.lock();
        state.attempts.remove(target);
        state.last_action.remove(target);
        info!(target = %target, "Target reset by operator");
    }

    /// Targets that have reached `max_attempts`
    pub fn exhausted_targets(&self) -> Vec<String> {
        let state = self.lock();
        state
            .attempts
            .iter()
            .filter(|(_, attempts)| **attempts >= self.policy.max_attempts)
            .map(|(target, _)| target.clone())
            .collect()
    }

    fn gate(&self, state: &LedgerState, target: &str) -> AttemptGate {
        if self.policy.excluded_targets.contains(target) {
            return AttemptGate::Excluded;
        }
        let attempts = state.attempts.get(target).copied().unwrap_or(0);
        if attempts >= self.policy.max_attempts {
            return AttemptGate::Exhausted { attempts };
        }
        if let Some(last) = state.last_action.get(target) {
            let elapsed = last.elapsed();
            if elapsed < self.policy.cooldown {
                return AttemptGate::CoolingDown {
                    remaining: self.policy.cooldown - elapsed,
                };
            }
        }
        AttemptGate::Allow
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LedgerState> {
        // A poisoned ledger still holds consistent maps; keep gating.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
