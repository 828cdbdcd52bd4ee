//! Warden Hooks System
//!
//! Bounded, retry-aware remediation driven by bus events.
//!
//! # Overview
//!
//! A [`Hook`] is a decision + action unit: `should_execute` decides cheaply
//! whether an event warrants action, `execute` performs one well-bounded
//! remediation and reports a structured [`HookResult`]. Every hook owns a
//! per-target [`TargetLedger`](retry::TargetLedger) enforcing attempt
//! limits, cooldowns, and static exclusions: the state machine that keeps
//! a flapping container from being restarted forever.
//!
//! # Architecture
//!
//! 1. **Contract** (`hook`, `types`): the two-method trait, context and
//!    result types
//! 2. **Ledger** (`retry`): per-target attempts/cooldown/exclusion with an
//!    atomic check-then-act attempt claim
//! 3. **Registry** (`registry`): id-keyed hook storage with a
//!    registry-level enable switch
//! 4. **Engine** (`engine`): bus subscription fanning out executions as
//!    independent tasks
//! 5. **Runtime client** (`runtime`): docker/podman CLI seam, every call
//!    under an explicit timeout
//! 6. **Built-in hooks** (`hooks`): container restart, resource scaling,
//!    log patterns
//! 7. **Configuration** (`config`): YAML settings with up-front validation
//!
//! # State machine
//!
//! Per target: `IDLE → ATTEMPTING → {SUCCEEDED, DEGRADED, FAILED}` and back
//! to `IDLE`. Success requires the action *and* post-action verification;
//! only success resets the attempt counter. A target that exhausts
//! `max_attempts` is terminal until an explicit operator reset.
//!
//! # Error Handling
//!
//! Nothing escapes a hook's `execute` as an unhandled fault: command
//! failures and timeouts are folded into the returned result. Library
//! operations return `Result<T>`, an alias for
//! `std::result::Result<T, HookError>`.

pub mod config;
pub mod engine;
pub mod error;
pub mod hook;
pub mod hooks;
pub mod registry;
pub mod retry;
pub mod runtime;
pub mod types;

pub use config::{
    HookSettings, HooksConfig, LogPatternHookConfig, LogPatternRule, PatternSeverity,
    RemediationAction, RestartHookConfig, ScalingHookConfig,
};
pub use engine::HookEngine;
pub use error::{HookError, Result};
pub use hook::Hook;
pub use hooks::{
    ContainerRestartHook, LogPatternHook, ResourceScalingHook, LOG_PATTERN_HOOK_ID,
    RESTART_HOOK_ID, SCALING_HOOK_ID,
};
pub use registry::{HookRegistry, InMemoryHookRegistry};
pub use retry::{AttemptGate, RemediationOutcome, RetryPolicy, TargetLedger};
pub use runtime::{
    CliContainerRuntime, ContainerRuntime, ContainerStatus, HealthState, ResourceLimits,
};
pub use types::{
    HookContext, HookResult, CONTAINER_LOG_EVENT_NAME, CUSTOM_EVENT, RESOURCE_USAGE_EVENT,
    SERVICE_HEALTH_EVENT,
};
