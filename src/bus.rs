//! # Event Bus
//!
//! One broadcast channel per topic name. Topics publish every record right
//! after it is written; live readers subscribe to receive records written
//! after the moment they attach.
//!
//! ```text
//!   Topic "orders" write path ──publish──► channel "orders" ──► subscriber A
//!                                                          └──► subscriber B
//! ```
//!
//! There is no replay: a subscriber that attaches after a publish never sees
//! it. Historical records come from [`Topic::read`](crate::topic::Topic::read).
//!
//! Channels are created on first reference by either side and live as long
//! as the bus. The bus is owned by the process context and cloned into every
//! topic, so tests can run isolated buses side by side.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast;

use crate::subscription::LiveSubscription;
use crate::types::Record;

/// Per-topic broadcast channels.
///
/// Cheap to clone; clones share the same channels.
#[derive(Clone)]
pub struct EventBus {
    channels: Arc<Mutex<HashMap<String, broadcast::Sender<Record>>>>,
    capacity: usize,
}

impl EventBus {
    /// Creates a bus whose channels buffer `capacity` records.
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Arc::new(Mutex::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Returns the channel for `topic`, creating it on first reference.
    pub fn channel(&self, topic: &str) -> broadcast::Sender<Record> {
        let mut channels = self.lock();
        channels
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    /// Sends `record` to everyone currently subscribed to `topic`.
    ///
    /// Returns how many subscribers received it. Publishing with nobody
    /// listening is not an error.
    pub fn publish(&self, topic: &str, record: Record) -> usize {
        self.channel(topic).send(record).unwrap_or(0)
    }

    /// Attaches a listener to `topic`.
    ///
    /// The subscription sees every record published after this call returns.
    /// Dropping it detaches the listener.
    pub fn subscribe(&self, topic: &str) -> LiveSubscription {
        LiveSubscription::new(self.channel(topic).subscribe())
    }

    /// Number of listeners currently attached to `topic`.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.lock()
            .get(topic)
            .map_or(0, |sender| sender.receiver_count())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, broadcast::Sender<Record>>> {
        // the map is never left half-updated, so a poisoned lock is still usable
        self.channels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("channels", &self.lock().len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
