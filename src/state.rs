//! The aggregate the whole system exists to keep current.
//!
//! `TotalState` is owned exclusively by the synchronization engine; nothing
//! else holds a reference. Consumers receive complete serialized copies
//! through the publisher, so a reader can never observe a half-applied
//! update and no lock is shared across tasks.

use serde::Serialize;

use crate::codec::SaveCodec;

/// Health of the aggregate relative to the files on disk.
///
/// `Degraded` means the last refresh of some part failed and the previous
/// value is being served; `last_error` says why.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Ok,
    Degraded,
}

/// All characters' data plus the shared-stash contents.
///
/// Invariants:
/// - `shared_stash` always reflects the last successfully decoded stash file;
///   a failed decode retains the previous value.
/// - `characters` always reflects the last successful full directory scan;
///   a failed scan retains the previous list wholesale.
#[derive(Debug, Clone, Serialize)]
#[serde(bound(serialize = ""))]
pub struct TotalState<C: SaveCodec> {
    pub characters: Vec<C::Character>,
    pub shared_stash: Vec<C::Item>,
    pub status: SyncStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl<C: SaveCodec> TotalState<C> {
    pub fn new() -> Self {
        Self {
            characters: Vec::new(),
            shared_stash: Vec::new(),
            status: SyncStatus::Ok,
            last_error: None,
        }
    }

    /// Record a failed refresh. Existing contents are kept as-is.
    pub fn mark_degraded(&mut self, error: impl ToString) {
        self.status = SyncStatus::Degraded;
        self.last_error = Some(error.to_string());
    }

    /// Record a successful refresh.
    pub fn mark_ok(&mut self) {
        self.status = SyncStatus::Ok;
        self.last_error = None;
    }

    /// Serialize the aggregate to the published JSON form.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl<C: SaveCodec> Default for TotalState<C> {
    fn default() -> Self {
        Self::new()
    }
}
