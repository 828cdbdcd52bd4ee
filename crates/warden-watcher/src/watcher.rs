//! File-system watcher
//!
//! Wraps the native notification backend and converts raw, bursty OS
//! events into a de-noised, semantically tagged stream of bus events:
//! exclude/include glob filtering, content-hash suppression of no-op
//! modifications, debounced flushing, and category classification.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use globset::{Glob, GlobSet, GlobSetBuilder};
use notify::event::{EventKind, ModifyKind, RenameMode};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use warden_events::{Event, EventBus, EventBusError};

use crate::category::FileCategory;
use crate::change::{FileChange, FileChangeKind};
use crate::config::WatcherConfig;
use crate::debounce::DebounceBuffer;
use crate::error::{Result, WatcherError};
use crate::hasher::hash_file;

/// Source name stamped on every promoted event
pub const WATCHER_SOURCE: &str = "filesystem_watcher";

/// Debounced, pattern-filtered, hash-verified file-system watcher
///
/// `start()` and `stop()` are idempotent; `stop()` cancels the watch loop
/// and awaits its termination before returning.
pub struct FileSystemWatcher {
    config: WatcherConfig,
    bus: Arc<EventBus>,
    running: Arc<AtomicBool>,
    watch_handle: Mutex<Option<JoinHandle<()>>>,
}

impl FileSystemWatcher {
    /// Create a watcher publishing onto `bus`
    pub fn new(config: WatcherConfig, bus: Arc<EventBus>) -> Self {
        Self {
            config,
            bus,
            running: Arc::new(AtomicBool::new(false)),
            watch_handle: Mutex::new(None),
        }
    }

    /// Whether the watch loop is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Begin watching
    ///
    /// Missing watch paths are tolerated with a warning each; start fails
    /// only when no configured path exists at all. Idempotent.
    pub fn start(&self) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            debug!("Watcher already running");
            return Ok(());
        }

        let result = self.spawn_watch_loop();
        if result.is_err() {
            self.running.store(false, Ordering::SeqCst);
        }
        result
    }

    fn spawn_watch_loop(&self) -> Result<()> {
        let state = WatchState::new(&self.config)?;

        let existing: Vec<PathBuf> = self
            .config
            .watch_paths
            .iter()
            .filter(|path| {
                let exists = path.exists();
                if !exists {
                    warn!(path = %path.display(), "Watch path does not exist, skipping");
                }
                exists
            })
            .cloned()
            .collect();
        if existing.is_empty() {
            return Err(WatcherError::NoWatchablePaths);
        }

        let (tx, rx) = channel();
        let mut watcher = RecommendedWatcher::new(tx, notify::Config::default())?;
        let mode = if self.config.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        for path in &existing {
            watcher.watch(path, mode)?;
            info!(path = %path.display(), recursive = self.config.recursive, "Watching path");
        }

        let running = Arc::clone(&self.running);
        let bus = Arc::clone(&self.bus);
        let poll = self.config.poll();
        let handle = tokio::task::spawn_blocking(move || {
            // The backend stops delivering once the watcher drops; keep it
            // alive for the whole loop.
            let _watcher = watcher;
            let mut state = state;
            loop {
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                match rx.recv_timeout(poll) {
                    Ok(Ok(raw)) => state.ingest_raw(raw),
                    Ok(Err(e)) => warn!(error = %e, "Notification backend error"),
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => {
                        warn!("Notification channel disconnected, watch loop exiting");
                        break;
                    }
                }
                if state.buffer.is_ready() {
                    state.flush(&bus);
                }
            }
            // Don't lose changes observed just before shutdown.
            if state.buffer.has_pending() {
                state.flush(&bus);
            }
            debug!("Watch loop stopped");
        });
        *self
            .watch_handle
            .lock()
            .map_err(|e| WatcherError::Shutdown(e.to_string()))? = Some(handle);
        Ok(())
    }

    /// Stop watching
    ///
    /// Idempotent; awaits watch-loop termination so no detached work
    /// survives.
    pub async fn stop(&self) -> Result<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            debug!("Watcher already stopped");
            return Ok(());
        }
        let handle = self
            .watch_handle
            .lock()
            .map_err(|e| WatcherError::Shutdown(e.to_string()))?
            .take();
        if let Some(handle) = handle {
            handle
                .await
                .map_err(|e| WatcherError::Shutdown(e.to_string()))?;
        }
        info!("Watcher stopped");
        Ok(())
    }
}

/// Everything the watch loop owns: glob filters, the per-path hash cache,
/// and the debounce buffer
struct WatchState {
    include: Option<GlobSet>,
    exclude: Option<GlobSet>,
    hash_cache: HashMap<PathBuf, String>,
    buffer: DebounceBuffer,
}

impl WatchState {
    fn new(config: &WatcherConfig) -> Result<Self> {
        Ok(Self {
            include: build_globset(&config.include_patterns)?,
            exclude: build_globset(&config.exclude_patterns)?,
            hash_cache: HashMap::new(),
            buffer: DebounceBuffer::new(config.debounce()),
        })
    }

    fn ingest_raw(&mut self, raw: notify::Event) {
        match raw.kind {
            EventKind::Create(_) => {
                for path in raw.paths {
                    self.ingest(path, FileChangeKind::Created, None);
                }
            }
            EventKind::Remove(_) => {
                for path in raw.paths {
                    self.ingest(path, FileChangeKind::Deleted, None);
                }
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if raw.paths.len() == 2 => {
                let mut paths = raw.paths;
                let new_path = paths.pop().unwrap_or_default();
                let old_path = paths.pop().unwrap_or_default();
                self.ingest(new_path, FileChangeKind::Moved, Some(old_path));
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
                for path in raw.paths {
                    self.ingest(path, FileChangeKind::Deleted, None);
                }
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
                for path in raw.paths {
                    self.ingest(path, FileChangeKind::Created, None);
                }
            }
            EventKind::Modify(_) => {
                for path in raw.paths {
                    self.ingest(path, FileChangeKind::Modified, None);
                }
            }
            // Access and other notifications carry no change.
            _ => {}
        }
    }

    /// Filter, hash-verify, and buffer one change
    fn ingest(&mut self, path: PathBuf, kind: FileChangeKind, old_path: Option<PathBuf>) {
        if !self.path_qualifies(&path) {
            return;
        }

        let content_hash = match kind {
            FileChangeKind::Created | FileChangeKind::Modified | FileChangeKind::Moved => {
                hash_file(&path)
            }
            FileChangeKind::Deleted => None,
        };

        match kind {
            FileChangeKind::Modified => {
                // Editors touch mtime without changing bytes; hash equality
                // is the authoritative no-op signal.
                if let Some(hash) = &content_hash {
                    if self.hash_cache.get(&path) == Some(hash) {
                        debug!(path = %path.display(), "Suppressing unchanged modification");
                        return;
                    }
                    self.hash_cache.insert(path.clone(), hash.clone());
                }
            }
            FileChangeKind::Created => {
                if let Some(hash) = &content_hash {
                    self.hash_cache.insert(path.clone(), hash.clone());
                }
            }
            FileChangeKind::Deleted => {
                self.hash_cache.remove(&path);
            }
            FileChangeKind::Moved => {
                if let Some(old) = &old_path {
                    self.hash_cache.remove(old);
                }
                if let Some(hash) = &content_hash {
                    self.hash_cache.insert(path.clone(), hash.clone());
                }
            }
        }

        let category = FileCategory::classify(&path);
        self.buffer.collect(FileChange {
            path,
            kind,
            timestamp: Instant::now(),
            content_hash,
            old_path,
            category,
        });
    }

    /// Exclusion is checked first and always wins
    fn path_qualifies(&self, path: &Path) -> bool {
        if let Some(exclude) = &self.exclude {
            if exclude.is_match(path) {
                return false;
            }
        }
        match &self.include {
            Some(include) => include.is_match(path),
            None => true,
        }
    }

    fn flush(&mut self, bus: &EventBus) {
        let changes = self.buffer.drain();
        debug!(count = changes.len(), "Flushing debounced changes");
        for change in changes {
            let event = promote(&change);
            match bus.emit(event) {
                Ok(()) => {}
                Err(EventBusError::QueueFull { capacity }) => {
                    warn!(
                        path = %change.path.display(),
                        capacity = capacity,
                        "Event queue full, dropping file change"
                    );
                }
                Err(e) => {
                    warn!(path = %change.path.display(), error = %e, "Failed to publish file change");
                }
            }
        }
    }
}

fn build_globset(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(Some(builder.build()?))
}

/// Promote a drained change to a bus event
fn promote(change: &FileChange) -> Event {
    let mut event = Event::new(change.category.event_type(change.kind), WATCHER_SOURCE)
        .with_data(
            "file_path",
            serde_json::json!(change.path.to_string_lossy()),
        )
        .with_data("change_type", serde_json::json!(change.kind.as_str()))
        .with_metadata("category", change.category.tag())
        .with_tag("file")
        .with_tag(change.category.tag());
    if let Some(old_path) = &change.old_path {
        event = event.with_data("old_path", serde_json::json!(old_path.to_string_lossy()));
    }
    if let Some(hash) = &change.content_hash {
        event = event.with_metadata("content_hash", hash.clone());
    }
    event
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn state(include: &[&str], exclude: &[&str]) -> WatchState {
        WatchState::new(&WatcherConfig {
            include_patterns: include.iter().map(|s| s.to_string()).collect(),
            exclude_patterns: exclude.iter().map(|s| s.to_string()).collect(),
            debounce_ms: 0,
            ..WatcherConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_exclusion_wins_over_inclusion() {
        let state = state(&["**/*.tf"], &["**/secret/**"]);
        assert!(state.path_qualifies(Path::new("/repo/terraform/main.tf")));
        assert!(!state.path_qualifies(Path::new("/repo/secret/main.tf")));
        assert!(!state.path_qualifies(Path::new("/repo/notes.md")));
    }

    #[test]
    fn test_empty_include_matches_all() {
        let state = state(&[], &["**/*.log"]);
        assert!(state.path_qualifies(Path::new("/repo/anything.txt")));
        assert!(!state.path_qualifies(Path::new("/repo/noise.log")));
    }

    #[test]
    fn test_unchanged_modification_is_suppressed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.tf");
        std::fs::write(&path, "resource {}").unwrap();

        let mut state = state(&[], &[]);
        state.ingest(path.clone(), FileChangeKind::Created, None);
        assert_eq!(state.buffer.pending_count(), 1);
        state.buffer.drain();

        // Same bytes: raw notification arrives, nothing is promoted.
        state.ingest(path.clone(), FileChangeKind::Modified, None);
        assert_eq!(state.buffer.pending_count(), 0);

        std::fs::write(&path, "resource { changed }").unwrap();
        state.ingest(path, FileChangeKind::Modified, None);
        assert_eq!(state.buffer.pending_count(), 1);
    }

    #[test]
    fn test_deletion_clears_hash_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.py");
        std::fs::write(&path, "print()").unwrap();

        let mut state = state(&[], &[]);
        state.ingest(path.clone(), FileChangeKind::Created, None);
        state.ingest(path.clone(), FileChangeKind::Deleted, None);
        assert!(!state.hash_cache.contains_key(&path));
        // Created + Deleted coalesce per-path; the deletion is the survivor.
        let drained = state.buffer.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].kind, FileChangeKind::Deleted);
    }

    #[test]
    fn test_promote_carries_taxonomy_and_metadata() {
        let change = FileChange {
            path: PathBuf::from("terraform/main.tf"),
            kind: FileChangeKind::Modified,
            timestamp: Instant::now(),
            content_hash: Some("abc123".to_string()),
            old_path: None,
            category: FileCategory::Infrastructure,
        };
        let event = promote(&change);
        assert_eq!(event.event_type, "infrastructure.file.modified");
        assert_eq!(event.source, WATCHER_SOURCE);
        assert_eq!(event.data_str("file_path"), Some("terraform/main.tf"));
        assert_eq!(event.data_str("change_type"), Some("modified"));
        assert_eq!(event.metadata.get("content_hash").map(String::as_str), Some("abc123"));
        assert!(event.tags.contains("infrastructure"));
    }

    #[tokio::test]
    async fn test_start_fails_without_watchable_paths() {
        let bus = Arc::new(EventBus::new(warden_events::EventBusConfig::default()));
        let watcher = FileSystemWatcher::new(
            WatcherConfig {
                watch_paths: vec![PathBuf::from("/definitely/not/here")],
                ..WatcherConfig::default()
            },
            bus,
        );
        assert!(matches!(
            watcher.start(),
            Err(WatcherError::NoWatchablePaths)
        ));
        assert!(!watcher.is_running());
    }

    #[tokio::test]
    async fn test_start_and_stop_are_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let bus = Arc::new(EventBus::new(warden_events::EventBusConfig::default()));
        let watcher = FileSystemWatcher::new(
            WatcherConfig {
                watch_paths: vec![dir.path().to_path_buf()],
                debounce_ms: 50,
                poll_ms: 20,
                ..WatcherConfig::default()
            },
            bus,
        );
        watcher.start().unwrap();
        watcher.start().unwrap();
        assert!(watcher.is_running());
        watcher.stop().await.unwrap();
        watcher.stop().await.unwrap();
        assert!(!watcher.is_running());
    }

    #[tokio::test]
    async fn test_modification_reaches_the_bus() {
        let dir = tempfile::tempdir().unwrap();
        let bus = Arc::new(EventBus::new(warden_events::EventBusConfig {
            poll_interval: Duration::from_millis(20),
            ..warden_events::EventBusConfig::default()
        }));
        bus.start().await.unwrap();

        let watcher = FileSystemWatcher::new(
            WatcherConfig {
                watch_paths: vec![dir.path().to_path_buf()],
                debounce_ms: 100,
                poll_ms: 20,
                ..WatcherConfig::default()
            },
            Arc::clone(&bus),
        );
        watcher.start().unwrap();
        // Give the backend a moment to arm before generating changes.
        tokio::time::sleep(Duration::from_millis(200)).await;

        std::fs::write(dir.path().join("main.tf"), "resource {}").unwrap();

        let mut observed = Vec::new();
        for _ in 0..50 {
            observed = bus.recent_events(100).unwrap();
            if !observed.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(
            observed
                .iter()
                .any(|e| e.event_type.starts_with("infrastructure.file.")),
            "no infrastructure file event observed: {observed:?}"
        );

        watcher.stop().await.unwrap();
        bus.stop().await.unwrap();
    }
}
