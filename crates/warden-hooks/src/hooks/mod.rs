//! Built-in remediation hooks
//!
//! Three hooks ship with the engine, all gated by the same per-target
//! ledger machinery:
//!
//! - [`ContainerRestartHook`]: restarts containers reported unhealthy by
//!   `service_health` events, with post-restart health verification
//! - [`ResourceScalingHook`]: adjusts resource limits on sustained
//!   watermark breaches observed through `resource_usage` events
//! - [`LogPatternHook`]: matches container log lines against regex rules,
//!   notifying or restarting per rule

pub mod log_pattern;
pub mod restart;
pub mod scaling;

pub use log_pattern::{LogPatternHook, LOG_PATTERN_HOOK_ID};
pub use restart::{ContainerRestartHook, RESTART_HOOK_ID};
pub use scaling::{ResourceScalingHook, SCALING_HOOK_ID};
