//! The synchronization engine.
//!
//! A single task drains file events and applies them to the aggregate one at
//! a time, in arrival order. It is the only writer of [`TotalState`];
//! consumers receive complete serialized frames through the publisher, so
//! there is no shared lock and no reader can observe a partial update.
//!
//! Decode and scan failures are uniformly recoverable: the previous value is
//! retained and the aggregate is republished marked degraded. The engine
//! stops only when the event channel dies or the shared-stash file is
//! deleted and never recreated within the recovery budget.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::{Event, EventKind};
use tokio::sync::mpsc;
use tokio::time::{Duration, sleep};

use crate::codec::SaveCodec;
use crate::config::{RecoveryConfig, Settings};
use crate::publish::Publisher;
use crate::scan::{STASH_FILE_NAME, is_character_file, scan_characters};
use crate::stash::decode_shared_stash;
use crate::state::TotalState;

use super::debouncer::Debouncer;
use super::error::WatchError;
use super::registrar::WatchRegistrar;

/// Event-loop owner of the aggregate.
pub struct SyncEngine<C: SaveCodec> {
    codec: Arc<C>,
    save_root: PathBuf,
    stash_path: PathBuf,
    state: TotalState<C>,
    publisher: Publisher,
    registrar: WatchRegistrar,
    event_rx: mpsc::Receiver<notify::Result<Event>>,
    debouncer: Debouncer,
    recovery: RecoveryConfig,
    /// Why the last stash refresh failed, if it did.
    stash_error: Option<String>,
    /// Why the last character scan failed, if it did.
    scan_error: Option<String>,
}

impl<C: SaveCodec> SyncEngine<C> {
    /// Set up the engine for `save_root`. Fails if the directory does not
    /// exist; the shared-stash file is checked when [`watch`](Self::watch)
    /// starts.
    pub fn new(
        save_root: impl AsRef<Path>,
        codec: Arc<C>,
        publisher: Publisher,
        settings: &Settings,
    ) -> Result<Self, WatchError> {
        // Canonical so paths compare equal to the absolute paths notify
        // reports in events.
        let save_root = fs::canonicalize(save_root.as_ref())
            .map_err(|_| WatchError::path_not_found(save_root.as_ref()))?;
        let stash_path = save_root.join(STASH_FILE_NAME);

        let (tx, event_rx) = mpsc::channel(256);
        let registrar = WatchRegistrar::new(tx)?;

        Ok(Self {
            codec,
            save_root,
            stash_path,
            state: TotalState::new(),
            publisher,
            registrar,
            event_rx,
            debouncer: Debouncer::new(settings.watch.debounce_ms),
            recovery: settings.watch.recovery.clone(),
            stash_error: None,
            scan_error: None,
        })
    }

    /// Seed the aggregate, then consume file events until a fatal error.
    pub async fn watch(mut self) -> Result<(), WatchError> {
        self.bootstrap()?;
        crate::log_event!("engine", "started");

        loop {
            let tick = sleep(Duration::from_millis(100));
            tokio::pin!(tick);

            tokio::select! {
                received = self.event_rx.recv() => match received {
                    Some(Ok(event)) => self.process_event(event).await?,
                    Some(Err(e)) => {
                        // Watch-subsystem errors are reported, never fatal.
                        tracing::error!("[engine] watch stream error: {e}");
                    }
                    None => return Err(WatchError::ChannelClosed),
                },
                _ = &mut tick => {
                    for path in self.debouncer.drain_ready() {
                        self.process_change(path).await?;
                    }
                }
            }
        }
    }

    /// Register watches, run the initial decode and full scan, publish.
    ///
    /// Registration happens first so a save written during the initial scan
    /// still produces an event instead of slipping into an unobserved
    /// window.
    fn bootstrap(&mut self) -> Result<(), WatchError> {
        if !self.stash_path.is_file() {
            return Err(WatchError::path_not_found(&self.stash_path));
        }

        let registered = self
            .registrar
            .register_tree(&self.save_root, &self.stash_path)?;
        crate::log_event!(
            "engine",
            "watching",
            "{registered} files under {}",
            self.save_root.display()
        );

        self.refresh_stash();
        self.refresh_characters();
        self.publish();
        Ok(())
    }

    async fn process_event(&mut self, event: Event) -> Result<(), WatchError> {
        let Event { kind, paths, .. } = event;
        for path in paths {
            if path != self.stash_path && !is_character_file(&path) {
                crate::debug_event!("engine", "ignored", "{kind:?} {}", path.display());
                continue;
            }
            match kind {
                EventKind::Create(_) | EventKind::Modify(_) => {
                    self.debouncer.record(path);
                }
                EventKind::Remove(_) => {
                    self.debouncer.cancel(&path);
                    self.handle_removal(path).await?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Apply a debounced create/modify once the path has gone quiet.
    async fn process_change(&mut self, path: PathBuf) -> Result<(), WatchError> {
        if !path.exists() {
            // Rename-as-modify: the path vanished before the debounce
            // window closed. Treat it as the removal it really is.
            return self.handle_removal(path).await;
        }

        crate::log_event!("engine", "changed", "{}", path.display());
        if path == self.stash_path {
            self.refresh_stash();
        } else {
            self.refresh_characters();
        }
        self.publish();
        Ok(())
    }

    /// React to a deleted watch target.
    ///
    /// The watch subsystem drops its registration when a watched file is
    /// deleted, and this writer's save pattern is delete-then-recreate, so
    /// deletion is first of all a re-arm trigger. The shared-stash file must
    /// come back; if it never does the aggregate is permanently
    /// desynchronized and the engine stops. A character file that stays gone
    /// is simply a deleted character; the full rescan reflects it.
    async fn handle_removal(&mut self, path: PathBuf) -> Result<(), WatchError> {
        crate::log_event!("engine", "removed", "{}", path.display());
        let recovered = self.recover_path(&path).await;

        if path == self.stash_path {
            if !recovered {
                return Err(WatchError::path_not_found(path));
            }
            self.refresh_stash();
        } else {
            self.refresh_characters();
        }
        self.publish();
        Ok(())
    }

    /// Wait for a delete-recreate writer to bring `path` back, re-arming its
    /// watch on reappearance. Bounded: up to `max_attempts` waits with a
    /// doubling delay. Returns false if the path never reappeared.
    async fn recover_path(&mut self, path: &Path) -> bool {
        let mut delay = Duration::from_millis(self.recovery.initial_delay_ms);
        for attempt in 1..=self.recovery.max_attempts {
            sleep(delay).await;
            if path.exists() {
                match self.registrar.rearm(path) {
                    Ok(()) => {
                        crate::debug_event!(
                            "engine",
                            "rearmed",
                            "{} (attempt {attempt})",
                            path.display()
                        );
                        return true;
                    }
                    Err(e) => {
                        tracing::warn!("[engine] re-arm failed for {}: {e}", path.display());
                    }
                }
            }
            delay *= 2;
        }
        false
    }

    /// Re-decode the shared-stash file, keeping the previous contents on
    /// failure.
    fn refresh_stash(&mut self) {
        let decoded = fs::read(&self.stash_path)
            .map_err(|e| format!("cannot read {}: {e}", self.stash_path.display()))
            .and_then(|bytes| {
                decode_shared_stash(self.codec.as_ref(), &bytes).map_err(|e| e.to_string())
            });

        match decoded {
            Ok(snapshot) => {
                crate::debug_event!(
                    "engine",
                    "stash decoded",
                    "version {}, {} pages, {} items",
                    snapshot.version_tag(),
                    snapshot.page_count(),
                    snapshot.items().count()
                );
                self.state.shared_stash = snapshot.into_items();
                self.stash_error = None;
            }
            Err(e) => {
                tracing::error!("[engine] stash refresh failed, keeping previous contents: {e}");
                self.stash_error = Some(e);
            }
        }
    }

    /// Re-run the full character scan, replacing the list wholesale on
    /// success and keeping the previous list on failure.
    fn refresh_characters(&mut self) {
        match scan_characters(self.codec.as_ref(), &self.save_root) {
            Ok(characters) => {
                crate::debug_event!("engine", "scanned", "{} characters", characters.len());
                self.state.characters = characters;
                self.scan_error = None;
            }
            Err(e) => {
                tracing::error!("[engine] character scan failed, keeping previous list: {e}");
                self.scan_error = Some(e.to_string());
            }
        }
    }

    /// Serialize the aggregate and hand it to the publisher. Publish
    /// failures are reported; the in-memory state is never rolled back.
    fn publish(&mut self) {
        match self.stash_error.as_deref().or(self.scan_error.as_deref()) {
            Some(error) => {
                let error = error.to_string();
                self.state.mark_degraded(error);
            }
            None => self.state.mark_ok(),
        }

        let payload = match self.state.to_json() {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!("[engine] cannot serialize aggregate: {e}");
                return;
            }
        };

        if let Err(e) = self.publisher.publish(payload) {
            tracing::warn!("[engine] publish failed: {e}");
        } else {
            crate::debug_event!(
                "engine",
                "published",
                "{} characters, {} stash items",
                self.state.characters.len(),
                self.state.shared_stash.len()
            );
        }
    }
}
