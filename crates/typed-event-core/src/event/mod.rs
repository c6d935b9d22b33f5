//! The single-event observer.
//!
//! - `typed` -- `Event<A>`, an ordered list of handlers for one payload type
//! - `handler` -- `Handler<A>`, a cloneable, directly callable handler
//! - `guard` -- `SubscriptionGuard`, a subscription bound to a scope

pub mod guard;
pub mod handler;
pub mod typed;

pub use guard::SubscriptionGuard;
pub use handler::{Handler, HandlerResult};
pub use typed::Event;
