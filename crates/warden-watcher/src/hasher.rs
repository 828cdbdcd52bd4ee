//! Best-effort content hashing
//!
//! Hash failures (permissions, a race with deletion) degrade to `None` and
//! a log line; they are never fatal to the watch loop.

use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::debug;

/// Compute the SHA-256 hash of a file's contents
///
/// Returns `None` when the file cannot be read; the change is still
/// published, just without hash metadata.
pub fn hash_file(path: &Path) -> Option<String> {
    match std::fs::read(path) {
        Ok(contents) => {
            let mut hasher = Sha256::new();
            hasher.update(&contents);
            Some(format!("{:x}", hasher.finalize()))
        }
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Content hash unavailable");
            None
        }
    }
}
