//! Error types for the event bus
//!
//! All bus operations return `Result<T>` which is an alias for
//! `std::result::Result<T, EventBusError>`. Failures a producer must react
//! to (a saturated queue, a bus that was never started) are explicit
//! variants rather than panics or silent drops.

use thiserror::Error;

/// Errors that can occur in the event bus
#[derive(Debug, Error)]
pub enum EventBusError {
    /// The bounded event queue is saturated
    ///
    /// Surfaced synchronously to the producer on `emit`. The bus never
    /// blocks the producer and never drops the event silently; the caller
    /// decides whether to drop, retry, or propagate.
    #[error("event queue is full (capacity {capacity})")]
    QueueFull {
        /// Configured queue capacity at the time of rejection
        capacity: usize,
    },

    /// The bus accepted no more events because it has been shut down
    #[error("event bus is closed")]
    Closed,

    /// The dispatch loop did not terminate cleanly on `stop()`
    #[error("dispatch loop shutdown failed: {0}")]
    Shutdown(String),

    /// History persistence failed
    ///
    /// Raised when flushing or loading history batches fails in a way that
    /// is not a plain IO or JSON error (e.g. an unusable persistence
    /// directory).
    #[error("history persistence error: {0}")]
    Persistence(String),

    /// IO error while reading or writing persisted history
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error while serializing or deserializing history batches
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for event bus operations
pub type Result<T> = std::result::Result<T, EventBusError>;
