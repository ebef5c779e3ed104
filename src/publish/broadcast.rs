//! Fan-out of aggregate frames to any number of subscribers.
//!
//! Every subscriber gets every frame independently over a bounded channel; a
//! slow or stalled subscriber lags and loses the oldest frames rather than
//! blocking the engine. The latest frame is retained so a new connection can
//! be served the current aggregate immediately.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;

/// Cloneable handle to the broadcast channel and the retained latest frame.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    sender: broadcast::Sender<Arc<str>>,
    latest: RwLock<Option<Arc<str>>>,
}

impl Broadcaster {
    /// `capacity` bounds each subscriber's buffer of unconsumed frames.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            inner: Arc::new(Inner {
                sender,
                latest: RwLock::new(None),
            }),
        }
    }

    /// Retain `payload` as the latest frame and send it to all subscribers.
    pub fn publish(&self, payload: String) {
        let frame: Arc<str> = payload.into();
        *self.inner.latest.write() = Some(frame.clone());

        match self.inner.sender.send(frame) {
            Ok(count) => {
                crate::debug_event!("broadcast", "sent", "frame to {count} subscribers");
            }
            Err(_) => {
                // No subscribers right now; the retained frame still serves
                // the next connection.
                crate::debug_event!("broadcast", "retained", "no subscribers");
            }
        }
    }

    /// Subscribe to future frames, also returning the current one (if any).
    ///
    /// The subscription is opened before the latest frame is read, so an
    /// update racing this call is delivered rather than lost; at worst the
    /// same frame arrives twice.
    pub fn subscribe(&self) -> (Option<Arc<str>>, broadcast::Receiver<Arc<str>>) {
        let receiver = self.inner.sender.subscribe();
        let current = self.inner.latest.read().clone();
        (current, receiver)
    }

    /// The most recently published frame.
    pub fn latest(&self) -> Option<Arc<str>> {
        self.inner.latest.read().clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.sender.receiver_count()
    }
}
