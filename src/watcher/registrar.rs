//! Watch registration for the save directory.
//!
//! Every file of interest is registered individually: the host watch
//! facility drops a file's registration when the file is deleted, which is
//! exactly what the game's delete-then-recreate save pattern does. The
//! engine re-arms paths through [`WatchRegistrar::rearm`] after recovery.

use std::path::Path;

use notify::{Event, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use walkdir::WalkDir;

use crate::scan::{is_character_file, is_stash_file};

use super::error::WatchError;

/// Owns the notify watcher and the set of per-file registrations.
pub struct WatchRegistrar {
    watcher: notify::RecommendedWatcher,
}

impl WatchRegistrar {
    /// Create a registrar delivering raw notify events into `tx`.
    pub fn new(tx: mpsc::Sender<notify::Result<Event>>) -> Result<Self, WatchError> {
        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.blocking_send(res);
        })?;
        Ok(Self { watcher })
    }

    /// Register the shared-stash file explicitly, then every character or
    /// stash file under `root`.
    ///
    /// The stash file is registered first and by absolute path, independent
    /// of the tree walk, so it is covered even if the walk would not reach
    /// it. Any registration failure aborts immediately: a partial watch set
    /// would go stale silently.
    pub fn register_tree(&mut self, root: &Path, stash_path: &Path) -> Result<usize, WatchError> {
        self.rearm(stash_path)?;
        let mut registered = 1usize;

        for entry in WalkDir::new(root) {
            let entry = entry.map_err(|e| WatchError::PathNotFound {
                path: e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf()),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path == stash_path {
                continue; // already registered above
            }
            if is_character_file(path) || is_stash_file(path) {
                self.rearm(path)?;
                registered += 1;
            }
        }
        Ok(registered)
    }

    /// Register (or re-register after delete-recreate) a single file.
    pub fn rearm(&mut self, path: &Path) -> Result<(), WatchError> {
        self.watcher
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|source| WatchError::registration(path, source))
    }
}

impl std::fmt::Debug for WatchRegistrar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchRegistrar").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn registers_stash_and_character_files() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let stash = root.join(crate::scan::STASH_FILE_NAME);
        fs::write(&stash, b"stash").unwrap();
        fs::write(root.join("Lena.d2s"), b"char").unwrap();
        fs::create_dir(root.join("backup")).unwrap();
        fs::write(root.join("backup/Rust.d2s"), b"char").unwrap();
        fs::write(root.join("readme.txt"), b"skip").unwrap();

        let (tx, _rx) = mpsc::channel(8);
        let mut registrar = WatchRegistrar::new(tx).unwrap();
        let registered = registrar.register_tree(root, &stash).unwrap();

        // stash + two characters; the text file is ignored
        assert_eq!(registered, 3);
    }

    #[tokio::test]
    async fn registration_failure_propagates() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join(crate::scan::STASH_FILE_NAME);

        let (tx, _rx) = mpsc::channel(8);
        let mut registrar = WatchRegistrar::new(tx).unwrap();

        let err = registrar.register_tree(dir.path(), &missing).unwrap_err();
        assert!(matches!(err, WatchError::Registration { .. }));
    }
}
