//! Internal change records, before promotion to bus events

use std::path::PathBuf;
use std::time::Instant;

use crate::category::FileCategory;

/// Kind of file-system change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileChangeKind {
    Created,
    Modified,
    Deleted,
    Moved,
}

impl FileChangeKind {
    /// Lowercase name used in the dotted event taxonomy
    pub fn as_str(&self) -> &'static str {
        match self {
            FileChangeKind::Created => "created",
            FileChangeKind::Modified => "modified",
            FileChangeKind::Deleted => "deleted",
            FileChangeKind::Moved => "moved",
        }
    }
}

/// A de-noised file change awaiting the debounce flush
///
/// A `Modified` change whose content hash equals the last observed hash for
/// the path never becomes a `FileChange` at all; hash equality is the
/// authoritative "no real change" signal, ahead of raw OS notifications.
#[derive(Debug, Clone)]
pub struct FileChange {
    /// Affected path (the new path for `Moved`)
    pub path: PathBuf,

    /// Kind of change
    pub kind: FileChangeKind,

    /// When the change was observed
    pub timestamp: Instant,

    /// Content hash for `Created`/`Modified`; `None` when hashing failed or
    /// does not apply
    pub content_hash: Option<String>,

    /// Previous path, for `Moved`
    pub old_path: Option<PathBuf>,

    /// Category inferred from extension/path heuristics
    pub category: FileCategory,
}
