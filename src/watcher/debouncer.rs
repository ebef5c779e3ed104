//! Debouncing for file modification events.
//!
//! The game saves with bursts of writes (and editors do the same), so a path
//! is only processed once it has been quiet for the configured window.
//! Deletions are never debounced; the engine handles them immediately and
//! cancels any pending modification for the same path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Tracks the last modification time per path and releases paths that have
/// been stable for the configured window.
#[derive(Debug)]
pub struct Debouncer {
    pending: HashMap<PathBuf, Instant>,
    window: Duration,
}

impl Debouncer {
    pub fn new(window_ms: u64) -> Self {
        Self {
            pending: HashMap::new(),
            window: Duration::from_millis(window_ms),
        }
    }

    /// Note a modification, restarting the quiet window for `path`.
    pub fn record(&mut self, path: PathBuf) {
        self.pending.insert(path, Instant::now());
    }

    /// Drop a pending modification (the path was deleted).
    pub fn cancel(&mut self, path: &Path) {
        self.pending.remove(path);
    }

    /// Remove and return every path whose quiet window has elapsed.
    pub fn drain_ready(&mut self) -> Vec<PathBuf> {
        let now = Instant::now();
        let mut ready = Vec::new();
        self.pending.retain(|path, last| {
            if now.duration_since(*last) >= self.window {
                ready.push(path.clone());
                false
            } else {
                true
            }
        });
        ready
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
