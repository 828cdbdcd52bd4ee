//! The hook contract
//!
//! A hook is a decision + action unit: `should_execute` is the cheap,
//! side-effect-light gate (it may update internal observation buffers but
//! never remediates), `execute` performs the bounded remediation and folds
//! every failure into the returned [`HookResult`].

use async_trait::async_trait;

use crate::config::HookSettings;
use crate::types::{HookContext, HookResult};

/// A pluggable decision + action unit reacting to bus events
///
/// Implementations own their retry/cooldown/exclusion state (a
/// [`TargetLedger`](crate::retry::TargetLedger) keyed by remediation
/// target) and must be `Send + Sync`: the engine fans out executions as
/// independent tasks.
///
/// # Contract
///
/// - `should_execute` returns `false` when the hook is disabled, the event
///   doesn't match its trigger shape, the target is excluded, attempts are
///   exhausted, or the target is inside its cooldown window
/// - `execute` claims the attempt (counter + cooldown clock) *before*
///   remediating and never lets an error escape its boundary
#[async_trait]
pub trait Hook: Send + Sync {
    /// Stable identifier, used as the registry key
    fn id(&self) -> &str;

    /// Uniform settings (enable flag, retry limits, notification flags)
    fn settings(&self) -> &HookSettings;

    /// Decide whether this event warrants action
    fn should_execute(&self, ctx: &HookContext) -> bool;

    /// Perform the remediation
    async fn execute(&self, ctx: &HookContext) -> HookResult;
}
