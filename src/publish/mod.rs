//! Republishing the serialized aggregate.
//!
//! Two interchangeable strategies, selected by deployment mode: a file sink
//! overwriting a JSON document on disk (`export`), and a broadcast sink
//! fanning frames out to connected WebSocket clients (`serve`). Both consume
//! the complete serialized aggregate, never the live state.

mod broadcast;
mod file;
pub mod server;

use std::path::PathBuf;

use thiserror::Error;

pub use broadcast::Broadcaster;
pub use file::FileSink;

/// Errors from handing a frame to a sink.
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("cannot write aggregate to {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Destination for serialized aggregate frames.
#[derive(Debug, Clone)]
pub enum Publisher {
    File(FileSink),
    Broadcast(Broadcaster),
}

impl Publisher {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Publisher::File(FileSink::new(path))
    }

    pub fn broadcast(broadcaster: Broadcaster) -> Self {
        Publisher::Broadcast(broadcaster)
    }

    /// Deliver one frame. Broadcast delivery cannot fail: a frame with no
    /// subscribers is simply retained as the latest.
    pub fn publish(&self, payload: String) -> Result<(), PublishError> {
        match self {
            Publisher::File(sink) => sink.write(&payload),
            Publisher::Broadcast(broadcaster) => {
                broadcaster.publish(payload);
                Ok(())
            }
        }
    }
}
