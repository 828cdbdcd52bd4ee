//! Error types for the hooks system
//!
//! Failures inside a hook's `execute` never escape its boundary: they are
//! folded into the returned `HookResult`. The variants here describe what
//! went wrong on the way (an external command that timed out or failed, a
//! registry problem, invalid configuration) so the result can carry a
//! precise message.

use thiserror::Error;

/// Errors that can occur in the hooks system
#[derive(Debug, Error)]
pub enum HookError {
    /// An external command exceeded its deadline
    ///
    /// Always treated as a FAILED remediation outcome, never an unhandled
    /// fault.
    #[error("command '{command}' timed out after {timeout_ms}ms")]
    Timeout {
        /// The command that was cancelled
        command: String,
        /// Deadline that was exceeded, in milliseconds
        timeout_ms: u64,
    },

    /// An external command returned a non-zero exit status
    ///
    /// The stderr output is captured verbatim so the hook result can report
    /// exactly what the runtime said.
    #[error("command '{command}' failed with exit code {code:?}: {stderr}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// No supported container runtime responded to probing
    #[error("no container runtime available (probed: {probed})")]
    RuntimeUnavailable {
        /// Comma-separated list of binaries that were probed
        probed: String,
    },

    /// Hook not found in the registry
    #[error("hook not found: {0}")]
    HookNotFound(String),

    /// A hook with the same id is already registered
    #[error("hook already registered: {0}")]
    AlreadyRegistered(String),

    /// Registry state is unavailable
    #[error("registry error: {0}")]
    Registry(String),

    /// Invalid hook configuration
    ///
    /// Raised by the validator: a regex that does not compile, a zero
    /// `max_attempts`, inverted watermarks.
    #[error("invalid hook configuration: {0}")]
    InvalidConfiguration(String),

    /// YAML (de)serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_yaml::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for hooks operations
pub type Result<T> = std::result::Result<T, HookError>;
