//! Event history persistence
//!
//! History is serialized as timestamped batch files
//! (`events-<millis>.json`) in a configured directory. On restart the most
//! recently modified batch is loaded back into in-memory history. A corrupt
//! batch is logged and skipped rather than failing startup.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, warn};

use crate::error::Result;
use crate::types::Event;

const BATCH_PREFIX: &str = "events-";
const BATCH_SUFFIX: &str = ".json";

/// Stores event history batches in a directory
#[derive(Debug, Clone)]
pub struct HistoryStore {
    dir: PathBuf,
}

impl HistoryStore {
    /// Create a store rooted at `dir`; the directory is created lazily on
    /// first save
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory this store writes to
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist a batch of events as a new timestamped file
    pub fn save_batch(&self, events: &[Event]) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let name = format!(
            "{}{}{}",
            BATCH_PREFIX,
            chrono::Utc::now().timestamp_millis(),
            BATCH_SUFFIX
        );
        let path = self.dir.join(name);
        let json = serde_json::to_string(events)?;
        fs::write(&path, json)?;
        debug!(path = %path.display(), count = events.len(), "Persisted event batch");
        Ok(path)
    }

    /// Load the most recently modified batch
    ///
    /// A missing directory means no history yet (empty result). A batch that
    /// fails to parse is logged and skipped; persistence is best-effort and
    /// must never block startup.
    pub fn load_latest(&self) -> Result<Vec<Event>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut latest: Option<(SystemTime, PathBuf)> = None;
        for entry in entries.flatten() {
            let path = entry.path();
            let name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name,
                None => continue,
            };
            if !name.starts_with(BATCH_PREFIX) || !name.ends_with(BATCH_SUFFIX) {
                continue;
            }
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            if latest.as_ref().map(|(t, _)| modified > *t).unwrap_or(true) {
                latest = Some((modified, path));
            }
        }

        let Some((_, path)) = latest else {
            return Ok(Vec::new());
        };

        let json = fs::read_to_string(&path)?;
        match serde_json::from_str::<Vec<Event>>(&json) {
            Ok(events) => {
                debug!(path = %path.display(), count = events.len(), "Loaded event batch");
                Ok(events)
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Skipping corrupt event batch"
                );
                Ok(Vec::new())
            }
        }
    }
}
