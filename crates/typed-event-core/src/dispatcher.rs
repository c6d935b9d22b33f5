//! Type-keyed dispatcher.
//!
//! `Dispatcher` holds one [`Event`] per payload type, keyed by `TypeId`.
//! A payload type names itself through [`EventPayload::NAME`], which is what
//! shows up in logs and errors.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::trace;
use typed_event_types::config::ErrorPolicy;
use typed_event_types::error::SubscriptionError;
use typed_event_types::subscription::SubscriptionId;

use crate::error::DispatchError;
use crate::event::{Event, HandlerResult, SubscriptionGuard};

/// A Rust type that can be dispatched through a [`Dispatcher`].
pub trait EventPayload: Send + Sync + 'static {
    /// Stable, human-readable event name.
    const NAME: &'static str;
}

/// Object-safe view of an `Event<E>` for bookkeeping across payload types.
trait ErasedEvent: Send + Sync {
    fn name(&self) -> &str;
    fn subscriber_count(&self) -> usize;
    fn remove(&self, id: SubscriptionId) -> bool;
    fn as_any(&self) -> &dyn Any;
}

impl<A: Send + Sync + 'static> ErasedEvent for Event<A> {
    fn name(&self) -> &str {
        Event::name(self)
    }

    fn subscriber_count(&self) -> usize {
        self.len()
    }

    fn remove(&self, id: SubscriptionId) -> bool {
        self.unsubscribe(id).is_ok()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Events keyed by payload type.
///
/// Cloning produces a shared view. Events are created on first use, so
/// dispatching a type nobody subscribed to is a no-op.
#[derive(Clone)]
pub struct Dispatcher {
    events: Arc<DashMap<TypeId, Arc<dyn ErasedEvent>>>,
    policy: ErrorPolicy,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::with_policy(ErrorPolicy::default())
    }

    /// Every event created by this dispatcher uses `policy`.
    pub fn with_policy(policy: ErrorPolicy) -> Self {
        Self {
            events: Arc::new(DashMap::new()),
            policy,
        }
    }

    pub fn policy(&self) -> ErrorPolicy {
        self.policy
    }

    /// The event for payload type `E`, created if needed.
    pub fn event<E: EventPayload>(&self) -> Event<E> {
        let entry = self
            .events
            .entry(TypeId::of::<E>())
            .or_insert_with(|| {
                Arc::new(Event::<E>::with_policy(E::NAME, self.policy)) as Arc<dyn ErasedEvent>
            });
        entry
            .as_any()
            .downcast_ref::<Event<E>>()
            .cloned()
            .expect("dispatcher entry keyed by TypeId holds an event of that type")
    }

    /// The event for `E`, only if something has already created it.
    pub fn find<E: EventPayload>(&self) -> Option<Event<E>> {
        self.events
            .get(&TypeId::of::<E>())
            .and_then(|entry| entry.as_any().downcast_ref::<Event<E>>().cloned())
    }

    pub fn subscribe<E, F>(&self, f: F) -> SubscriptionId
    where
        E: EventPayload,
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.event::<E>().subscribe(f)
    }

    pub fn subscribe_fallible<E, F>(&self, f: F) -> SubscriptionId
    where
        E: EventPayload,
        F: Fn(&E) -> HandlerResult + Send + Sync + 'static,
    {
        self.event::<E>().subscribe_fallible(f)
    }

    pub fn subscribe_scoped<E, F>(&self, f: F) -> SubscriptionGuard
    where
        E: EventPayload,
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.event::<E>().subscribe_scoped(f)
    }

    /// Remove a subscription from the event for `E`.
    pub fn unsubscribe<E: EventPayload>(
        &self,
        id: SubscriptionId,
    ) -> Result<(), SubscriptionError> {
        match self.find::<E>() {
            Some(event) => event.unsubscribe(id),
            None => Err(SubscriptionError::NotSubscribed {
                event: E::NAME.to_string(),
                id,
            }),
        }
    }

    /// Remove a subscription without knowing its payload type.
    pub fn unsubscribe_any(&self, id: SubscriptionId) -> Result<(), SubscriptionError> {
        let events: Vec<Arc<dyn ErasedEvent>> =
            self.events.iter().map(|entry| entry.value().clone()).collect();

        if events.iter().any(|event| event.remove(id)) {
            Ok(())
        } else {
            Err(SubscriptionError::NotSubscribed {
                event: "<any>".to_string(),
                id,
            })
        }
    }

    /// Dispatch `payload` to every handler subscribed for `E`.
    pub fn dispatch<E: EventPayload>(&self, payload: &E) -> Result<usize, DispatchError> {
        match self.find::<E>() {
            Some(event) => event.dispatch(payload),
            None => {
                trace!(event = E::NAME, "no subscribers registered");
                Ok(0)
            }
        }
    }

    pub fn listener_count<E: EventPayload>(&self) -> usize {
        self.find::<E>().map_or(0, |event| event.len())
    }

    pub fn total_listener_count(&self) -> usize {
        self.events
            .iter()
            .map(|entry| entry.value().subscriber_count())
            .sum()
    }

    /// Names of every event created so far, sorted.
    pub fn event_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .events
            .iter()
            .map(|entry| entry.value().name().to_string())
            .collect();
        names.sort();
        names
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("policy", &self.policy)
            .field("events", &self.events.len())
            .field("listeners", &self.total_listener_count())
            .finish()
    }
}
