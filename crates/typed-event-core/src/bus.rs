//! Broadcast bus for handing dispatched payloads to async consumers.
//!
//! Built on `tokio::sync::broadcast`, the `EventBus` supports multiple
//! concurrent subscribers. Publishing with no active subscribers is a no-op.
//! [`EventBus::attach`] bridges a synchronous [`Event`] onto the bus for as
//! long as the returned guard lives, so every dispatch is also seen by async
//! receivers.

use tokio::sync::broadcast;
use typed_event_types::config::BusConfig;

use crate::event::{Event, SubscriptionGuard};

/// Multi-consumer bus for payloads of type `T`.
///
/// Wraps a `tokio::sync::broadcast` channel. Cloning the bus clones the
/// sender, allowing multiple producers and consumers.
pub struct EventBus<T> {
    sender: broadcast::Sender<T>,
}

impl<T: Clone + Send + 'static> EventBus<T> {
    /// Create a new bus with the given channel capacity (at least 1).
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn from_config(config: &BusConfig) -> Self {
        Self::new(config.capacity)
    }

    /// Create a new subscriber that will receive all future payloads.
    pub fn subscribe(&self) -> broadcast::Receiver<T> {
        self.sender.subscribe()
    }

    /// Publish a payload to all current subscribers.
    ///
    /// Returns how many receivers it was delivered to; 0 when there are none.
    pub fn publish(&self, payload: T) -> usize {
        self.sender.send(payload).unwrap_or(0)
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Access the underlying broadcast sender.
    pub fn sender(&self) -> &broadcast::Sender<T> {
        &self.sender
    }

    /// Forward every dispatch of `event` onto this bus until the guard is
    /// dropped. [`SubscriptionGuard::detach`] keeps the bridge for good.
    pub fn attach(&self, event: &Event<T>) -> SubscriptionGuard {
        let sender = self.sender.clone();
        event.subscribe_scoped(move |payload: &T| {
            let _ = sender.send(payload.clone());
        })
    }
}

impl<T> Clone for EventBus<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<T> std::fmt::Debug for EventBus<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("receiver_count", &self.sender.receiver_count())
            .finish()
    }
}
