//! In-memory map of recipients to their live delivery streams.
//!
//! Each open stream owns a bounded channel. [`NotificationRegistry::send`]
//! pushes with `try_send`, so a consumer that stops reading loses messages
//! instead of stalling the relay or other recipients.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, info};
use uuid::Uuid;

/// Per-stream channel capacity when none is configured.
pub const DEFAULT_STREAM_BUFFER: usize = 16;

pub type StreamId = u64;

/// A serialized notification, shared by every stream it is fanned out to.
pub type Frame = Arc<str>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("registry is shutting down")]
    ShuttingDown,
}

/// Outcome of one [`NotificationRegistry::send`] call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub delivered: usize,
    pub dropped: usize,
}

pub struct NotificationRegistry {
    streams: RwLock<HashMap<Uuid, HashMap<StreamId, mpsc::Sender<Frame>>>>,
    next_stream_id: AtomicU64,
    buffer: usize,
    accepting: AtomicBool,
}

impl NotificationRegistry {
    /// `buffer` is the per-stream capacity; zero is raised to one.
    pub fn new(buffer: usize) -> Self {
        Self {
            streams: RwLock::new(HashMap::new()),
            next_stream_id: AtomicU64::new(1),
            buffer: buffer.max(1),
            accepting: AtomicBool::new(true),
        }
    }

    /// Open a new stream for `recipient`.
    ///
    /// The returned [`Subscription`] is the read side; dropping it unregisters
    /// the stream.
    pub fn register(self: &Arc<Self>, recipient: Uuid) -> Result<Subscription, RegistryError> {
        let (tx, rx) = mpsc::channel(self.buffer);
        let id = self.next_stream_id.fetch_add(1, Ordering::Relaxed);
        {
            let mut streams = self.streams.write();
            // Checked under the write lock so nothing registers after shutdown() returns.
            if !self.accepting.load(Ordering::Acquire) {
                return Err(RegistryError::ShuttingDown);
            }
            streams.entry(recipient).or_default().insert(id, tx);
        }
        debug!(user_id = %recipient, stream_id = id, "stream registered");
        Ok(Subscription {
            registry: Arc::clone(self),
            recipient,
            id,
            rx,
        })
    }

    /// Remove exactly one stream. The recipient entry goes with its last stream.
    ///
    /// Returns `false` if the stream was not registered.
    pub fn unregister(&self, recipient: Uuid, stream_id: StreamId) -> bool {
        let mut streams = self.streams.write();
        let Some(set) = streams.get_mut(&recipient) else {
            return false;
        };
        let removed = set.remove(&stream_id).is_some();
        if set.is_empty() {
            streams.remove(&recipient);
        }
        removed
    }

    /// Push `payload` to every open stream of `recipient`, at most one attempt each.
    ///
    /// Nobody listening is not an error: the notification is simply lost.
    pub fn send<T>(&self, recipient: Uuid, payload: &T) -> Delivery
    where
        T: Serialize + ?Sized,
    {
        let streams = self.streams.read();
        let Some(set) = streams.get(&recipient) else {
            return Delivery::default();
        };

        let frame: Frame = match serde_json::to_string(payload) {
            Ok(json) => json.into(),
            Err(e) => {
                error!(user_id = %recipient, error = %e, "failed to serialize notification");
                return Delivery::default();
            }
        };

        let mut delivery = Delivery::default();
        for (&stream_id, tx) in set {
            match tx.try_send(Arc::clone(&frame)) {
                Ok(()) => delivery.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    delivery.dropped += 1;
                    debug!(user_id = %recipient, stream_id, "stream buffer full, notification dropped");
                }
                Err(TrySendError::Closed(_)) => {
                    delivery.dropped += 1;
                    debug!(user_id = %recipient, stream_id, "stream closed, notification dropped");
                }
            }
        }
        delivery
    }

    /// Stop accepting registrations. Open streams are left to close on their own.
    pub fn shutdown(&self) {
        let _guard = self.streams.write();
        if self.accepting.swap(false, Ordering::AcqRel) {
            info!("notification registry closed to new streams");
        }
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::Acquire)
    }

    pub fn is_registered(&self, recipient: Uuid) -> bool {
        self.streams.read().contains_key(&recipient)
    }

    pub fn stream_count(&self, recipient: Uuid) -> usize {
        self.streams.read().get(&recipient).map_or(0, HashMap::len)
    }

    pub fn recipient_count(&self) -> usize {
        self.streams.read().len()
    }
}

impl Default for NotificationRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_STREAM_BUFFER)
    }
}

impl fmt::Debug for NotificationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationRegistry")
            .field("recipients", &self.recipient_count())
            .field("buffer", &self.buffer)
            .field("accepting", &self.is_accepting())
            .finish()
    }
}

/// Read side of one registered stream.
pub struct Subscription {
    registry: Arc<NotificationRegistry>,
    recipient: Uuid,
    id: StreamId,
    rx: mpsc::Receiver<Frame>,
}

impl Subscription {
    #[cfg(test)]
    fn recipient(&self) -> Uuid {
        self.recipient
    }

    pub fn id(&self) -> StreamId {
        self.id
    }

    /// Next notification for this stream.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.rx.recv().await
    }

    #[cfg(test)]
    fn try_recv(&mut self) -> Option<Frame> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.registry.unregister(self.recipient, self.id) {
            debug!(user_id = %self.recipient, stream_id = self.id, "stream unregistered");
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("recipient", &self.recipient)
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
