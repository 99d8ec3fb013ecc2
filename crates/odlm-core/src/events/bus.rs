//! Event bus for store watch events.
//!
//! Uses tokio's broadcast channel for multi-subscriber delivery. Slow
//! subscribers lag and must resynchronise from a fresh list.

use std::sync::Arc;
use tokio::sync::broadcast;

use super::types::WatchEvent;

/// Default buffer size for the broadcast channel.
/// Events beyond this limit will cause older events to be dropped for slow receivers.
const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Broadcaster for watch events.
///
/// Cheap to clone; all clones publish on the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<WatchEvent>,
}

impl EventBus {
    /// Create a new bus with default buffer size.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE)
    }

    /// Create a new bus with custom buffer size.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Create a new bus wrapped in an Arc for sharing.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Publish an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, 0 if none.
    pub fn publish(&self, event: WatchEvent) -> usize {
        self.sender.send(event).unwrap_or_default()
    }

    /// Subscribe to events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<WatchEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Check if there are any active subscribers.
    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}
