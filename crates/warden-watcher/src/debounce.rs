//! Change debouncing
//!
//! Accumulates file changes in a path-keyed buffer behind one shared quiet
//! window. Any qualifying change restarts the window; on expiry everything
//! accumulated since the last flush drains in a single cycle. This
//! coalesces rapid bursts (atomic-save-via-rename sequences, formatter
//! sweeps) into one flush instead of one event per raw notification.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::change::FileChange;

/// Path-keyed buffer of pending changes with a single shared window
#[derive(Debug)]
pub struct DebounceBuffer {
    /// Accumulated changes: path -> latest pending change
    pending: HashMap<PathBuf, FileChange>,
    /// Last time a change was collected; the window is measured from here
    last_change: Option<Instant>,
    window: Duration,
}

impl DebounceBuffer {
    /// Create a buffer with the given quiet window
    pub fn new(window: Duration) -> Self {
        Self {
            pending: HashMap::new(),
            last_change: None,
            window,
        }
    }

    /// Record a change, replacing any pending change for the same path and
    /// restarting the shared window
    pub fn collect(&mut self, change: FileChange) {
        self.last_change = Some(Instant::now());
        self.pending.insert(change.path.clone(), change);
    }

    /// Whether the quiet window has elapsed with changes waiting
    pub fn is_ready(&self) -> bool {
        match self.last_change {
            Some(last) => !self.pending.is_empty() && last.elapsed() >= self.window,
            None => false,
        }
    }

    /// Whether anything is buffered
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Number of buffered changes
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Drain all accumulated changes and reset the window
    pub fn drain(&mut self) -> Vec<FileChange> {
        self.last_change = None;
        self.pending.drain().map(|(_, change)| change).collect()
    }
}
