//! Error types for the watch layer.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from watch registration and the synchronization engine.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("failed to initialize file watcher: {source}")]
    Init { source: notify::Error },

    #[error("cannot watch {path}: {source}")]
    Registration {
        path: PathBuf,
        source: notify::Error,
    },

    #[error("path not found: {path}")]
    PathNotFound { path: PathBuf },

    #[error("watch event channel closed")]
    ChannelClosed,
}

impl WatchError {
    pub fn registration(path: impl Into<PathBuf>, source: notify::Error) -> Self {
        WatchError::Registration {
            path: path.into(),
            source,
        }
    }

    pub fn path_not_found(path: impl Into<PathBuf>) -> Self {
        WatchError::PathNotFound { path: path.into() }
    }
}

impl From<notify::Error> for WatchError {
    fn from(source: notify::Error) -> Self {
        WatchError::Init { source }
    }
}
