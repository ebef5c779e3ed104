//! stashwatch keeps a consolidated snapshot of a Diablo II save directory
//! (every character plus the shared-stash contents) synchronized with the
//! files on disk, and republishes it whenever the game rewrites a save.
//!
//! Character and item wire decoding is delegated through [`codec::SaveCodec`];
//! everything else lives here: the shared-stash binary decoder, the directory
//! scanner, the watch layer that survives delete-then-recreate writers, and
//! the file/broadcast publishers.

pub mod codec;
pub mod config;
pub mod logging;
pub mod publish;
pub mod scan;
pub mod stash;
pub mod state;
pub mod watcher;

pub use codec::{CharacterRecord, CodecError, SaveCodec};
pub use config::Settings;
pub use publish::{Broadcaster, FileSink, Publisher};
pub use scan::{CHARACTER_EXT, STASH_EXT, STASH_FILE_NAME, ScanError, scan_characters};
pub use stash::{StashError, StashPage, StashSnapshot, decode_shared_stash};
pub use state::{SyncStatus, TotalState};
pub use watcher::{SyncEngine, WatchError};
