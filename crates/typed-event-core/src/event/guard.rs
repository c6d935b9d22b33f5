use std::fmt;
use std::sync::Weak;

use typed_event_types::subscription::SubscriptionId;

/// Anything that can drop a subscription by id.
pub(crate) trait SubscriptionOwner: Send + Sync {
    /// Remove the subscription. Returns `false` if it was already gone.
    fn release(&self, id: SubscriptionId) -> bool;
}

/// A subscription that ends when the guard is dropped.
///
/// The guard holds only a weak reference to its event, so it never keeps the
/// event alive. Dropping a guard after the subscription was removed by other
/// means is a no-op.
#[must_use = "dropping the guard unsubscribes immediately"]
pub struct SubscriptionGuard {
    id: SubscriptionId,
    owner: Option<Weak<dyn SubscriptionOwner>>,
}

impl SubscriptionGuard {
    pub(crate) fn new(id: SubscriptionId, owner: Weak<dyn SubscriptionOwner>) -> Self {
        Self {
            id,
            owner: Some(owner),
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Keep the subscription alive past the guard. Returns its id so it can
    /// still be removed explicitly.
    pub fn detach(mut self) -> SubscriptionId {
        self.owner = None;
        self.id
    }

    /// Unsubscribe now. Returns `false` if the subscription or its event was
    /// already gone.
    pub fn unsubscribe(mut self) -> bool {
        self.release()
    }

    fn release(&mut self) -> bool {
        match self.owner.take().and_then(|weak| weak.upgrade()) {
            Some(owner) => owner.release(self.id),
            None => false,
        }
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for SubscriptionGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionGuard")
            .field("id", &self.id)
            .field("attached", &self.owner.is_some())
            .finish()
    }
}
