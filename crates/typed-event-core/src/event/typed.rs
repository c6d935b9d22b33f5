//! `Event<A>`: one event type, an ordered list of handlers for its payload.
//!
//! The payload type `A` is the event's schema. Subscribing a handler for a
//! different payload, or dispatching a value of a different type, does not
//! compile.
//!
//! Handlers run synchronously on the dispatching thread, in registration
//! order, each exactly once per dispatch. Dispatch works from a snapshot of
//! the handler list taken when it starts, so a handler may subscribe or
//! unsubscribe on the same event; the change applies to the next dispatch.

use std::any::type_name;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use tracing::{debug, debug_span, trace, warn};
use typed_event_types::config::ErrorPolicy;
use typed_event_types::error::SubscriptionError;
use typed_event_types::subscription::SubscriptionId;

use super::guard::{SubscriptionGuard, SubscriptionOwner};
use super::handler::{Handler, HandlerResult};
use crate::error::{DispatchError, HandlerFailure};

struct Subscriber<A> {
    id: SubscriptionId,
    handler: Handler<A>,
}

impl<A> Clone for Subscriber<A> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            handler: self.handler.clone(),
        }
    }
}

struct EventInner<A> {
    name: String,
    policy: ErrorPolicy,
    subscribers: RwLock<Vec<Subscriber<A>>>,
}

impl<A> EventInner<A> {
    fn read(&self) -> RwLockReadGuard<'_, Vec<Subscriber<A>>> {
        self.subscribers.read().expect("event subscriber lock poisoned")
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Subscriber<A>>> {
        self.subscribers.write().expect("event subscriber lock poisoned")
    }

    fn remove(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.write();
        match subscribers.iter().position(|s| s.id == id) {
            Some(index) => {
                subscribers.remove(index);
                debug!(event = %self.name, subscription = %id, "unsubscribed");
                true
            }
            None => false,
        }
    }
}

impl<A> SubscriptionOwner for EventInner<A> {
    fn release(&self, id: SubscriptionId) -> bool {
        self.remove(id)
    }
}

/// A typed event.
///
/// Cloning produces a shared view (backed by `Arc`): every clone sees the same
/// subscribers. Separately constructed events never share subscribers.
pub struct Event<A> {
    inner: Arc<EventInner<A>>,
}

impl<A: 'static> Event<A> {
    /// Create an event named after its payload type, stopping at the first
    /// failing handler.
    pub fn new() -> Self {
        Self::named(type_name::<A>())
    }

    /// Create an event with a display name used in logs and errors.
    pub fn named(name: impl Into<String>) -> Self {
        Self::with_policy(name, ErrorPolicy::default())
    }

    /// Create an event with an explicit handler-failure policy.
    pub fn with_policy(name: impl Into<String>, policy: ErrorPolicy) -> Self {
        Self {
            inner: Arc::new(EventInner {
                name: name.into(),
                policy,
                subscribers: RwLock::new(Vec::new()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn policy(&self) -> ErrorPolicy {
        self.inner.policy
    }

    /// Subscribe an infallible closure.
    pub fn subscribe<F>(&self, f: F) -> SubscriptionId
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        self.subscribe_handler(&Handler::new(f))
    }

    /// Subscribe a closure whose errors are reported by [`Event::dispatch`].
    pub fn subscribe_fallible<F>(&self, f: F) -> SubscriptionId
    where
        F: Fn(&A) -> HandlerResult + Send + Sync + 'static,
    {
        self.subscribe_handler(&Handler::fallible(f))
    }

    /// Subscribe an existing handler. The same handler may be subscribed
    /// more than once; each subscription is invoked on dispatch.
    pub fn subscribe_handler(&self, handler: &Handler<A>) -> SubscriptionId {
        let id = SubscriptionId::new();
        let mut subscribers = self.inner.write();
        subscribers.push(Subscriber {
            id,
            handler: handler.clone(),
        });
        debug!(
            event = %self.inner.name,
            subscription = %id,
            subscribers = subscribers.len(),
            "subscribed"
        );
        id
    }

    /// Subscribe `f` and hand it back as a [`Handler`].
    ///
    /// The returned handler can still be called directly, and removed later
    /// with [`Event::unsubscribe_handler`].
    pub fn listener<F>(&self, f: F) -> Handler<A>
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        let handler = Handler::new(f);
        self.subscribe_handler(&handler);
        handler
    }

    /// Subscribe `f` for as long as the returned guard lives.
    pub fn subscribe_scoped<F>(&self, f: F) -> SubscriptionGuard
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        let id = self.subscribe(f);
        let weak: Weak<EventInner<A>> = Arc::downgrade(&self.inner);
        let owner: Weak<dyn SubscriptionOwner> = weak;
        SubscriptionGuard::new(id, owner)
    }

    /// Remove a subscription.
    ///
    /// Returns [`SubscriptionError::NotSubscribed`] if the id is unknown or
    /// was already removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> Result<(), SubscriptionError> {
        if self.inner.remove(id) {
            Ok(())
        } else {
            Err(SubscriptionError::NotSubscribed {
                event: self.inner.name.clone(),
                id,
            })
        }
    }

    /// Remove the first subscription of `handler` (by identity).
    ///
    /// When a handler was subscribed several times only the earliest
    /// subscription is removed. Returns the removed subscription's id.
    pub fn unsubscribe_handler(
        &self,
        handler: &Handler<A>,
    ) -> Result<SubscriptionId, SubscriptionError> {
        let mut subscribers = self.inner.write();
        let index = subscribers
            .iter()
            .position(|s| s.handler.ptr_eq(handler))
            .ok_or_else(|| SubscriptionError::HandlerNotSubscribed(self.inner.name.clone()))?;
        let removed = subscribers.remove(index);
        debug!(event = %self.inner.name, subscription = %removed.id, "unsubscribed handler");
        Ok(removed.id)
    }

    pub fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.inner.read().iter().any(|s| s.id == id)
    }

    pub fn contains_handler(&self, handler: &Handler<A>) -> bool {
        self.inner.read().iter().any(|s| s.handler.ptr_eq(handler))
    }

    /// Subscription ids in registration order.
    pub fn subscriptions(&self) -> Vec<SubscriptionId> {
        self.inner.read().iter().map(|s| s.id).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Remove every subscription. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let removed = std::mem::take(&mut *self.inner.write()).len();
        debug!(event = %self.inner.name, removed, "cleared subscribers");
        removed
    }

    /// Invoke every current handler with `payload`, in registration order.
    ///
    /// Returns the number of handlers invoked. With [`ErrorPolicy::Stop`] the
    /// first failing handler ends the dispatch and its error is returned;
    /// with [`ErrorPolicy::Continue`] every handler runs and all failures are
    /// returned together. Panics in handlers are not caught.
    pub fn dispatch(&self, payload: &A) -> Result<usize, DispatchError> {
        // Snapshot so handlers can touch this event without deadlocking.
        let snapshot: Vec<Subscriber<A>> = self.inner.read().clone();
        let span = debug_span!("dispatch", event = %self.inner.name, subscribers = snapshot.len());
        let _enter = span.enter();

        let mut invoked = 0;
        let mut failures = Vec::new();

        for (position, subscriber) in snapshot.iter().enumerate() {
            invoked += 1;
            let Err(err) = subscriber.handler.call(payload) else {
                continue;
            };
            warn!(subscription = %subscriber.id, position, error = %err, "event handler failed");

            match self.inner.policy {
                ErrorPolicy::Stop => {
                    return Err(DispatchError::HandlerFailed {
                        event: self.inner.name.clone(),
                        subscription: subscriber.id,
                        position,
                        source: err.into(),
                    });
                }
                ErrorPolicy::Continue => failures.push(HandlerFailure {
                    subscription: subscriber.id,
                    position,
                    error: err.into(),
                }),
            }
        }

        if failures.is_empty() {
            trace!(invoked, "dispatch complete");
            Ok(invoked)
        } else {
            Err(DispatchError::HandlersFailed {
                event: self.inner.name.clone(),
                invoked,
                failures,
            })
        }
    }
}

impl<A: 'static> Default for Event<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> Clone for Event<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A> fmt::Debug for Event<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.inner.name)
            .field("policy", &self.inner.policy)
            .field("subscribers", &self.inner.read().len())
            .finish()
    }
}
