//! Error types for the file-system watcher

use thiserror::Error;

/// Errors that can occur in the file-system watcher
#[derive(Debug, Error)]
pub enum WatcherError {
    /// The OS notification backend failed
    #[error("notification backend error: {0}")]
    Notify(#[from] notify::Error),

    /// An include or exclude glob failed to compile
    #[error("invalid glob pattern: {0}")]
    Pattern(#[from] globset::Error),

    /// None of the configured watch paths exist on disk
    ///
    /// Individual missing paths are tolerated with a warning; this error is
    /// raised only when there is nothing left to watch at all.
    #[error("no watchable paths: none of the configured paths exist")]
    NoWatchablePaths,

    /// Configuration file could not be parsed
    #[error("configuration error: {0}")]
    Configuration(#[from] serde_yaml::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The watch loop did not terminate cleanly on `stop()`
    #[error("watch loop shutdown failed: {0}")]
    Shutdown(String),
}

/// Result type for watcher operations
pub type Result<T> = std::result::Result<T, WatcherError>;
