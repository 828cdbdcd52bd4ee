//! Warden File-System Watcher
//!
//! Converts raw, bursty OS file-system notifications into a de-noised,
//! semantically tagged stream of events on the Warden bus.
//!
//! # Pipeline
//!
//! 1. Raw notifications are filtered by exclude globs first (exclusion
//!    always wins), then matched against include globs
//! 2. Created/modified files are content-hashed; a modification whose hash
//!    equals the last observed hash for that path is suppressed as a no-op
//! 3. Surviving changes accumulate in a path-keyed debounce buffer behind a
//!    single shared quiet window; a flush drains everything at once
//! 4. Each drained change is classified by file category and published as
//!    `"<category>.file.<change>"` (e.g. `infrastructure.file.modified`)
//!
//! Hashing failures degrade to missing metadata, never a dead watcher;
//! missing watch paths warn instead of aborting start, so partially valid
//! configuration still watches what it can.

pub mod category;
pub mod change;
pub mod config;
pub mod debounce;
pub mod error;
pub mod hasher;
pub mod watcher;

pub use category::FileCategory;
pub use change::{FileChange, FileChangeKind};
pub use config::WatcherConfig;
pub use debounce::DebounceBuffer;
pub use error::{Result, WatcherError};
pub use watcher::{FileSystemWatcher, WATCHER_SOURCE};
