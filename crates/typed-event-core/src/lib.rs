//! Typed events and their dispatch.
//!
//! - `event` -- `Event<A>`, the single-event observer with typed handlers
//! - `dispatcher` -- `Dispatcher`, events keyed by their Rust payload type
//! - `registry` -- `EventRegistry`, events declared by name with runtime schemas
//! - `bus` -- `EventBus<T>`, a broadcast bridge for async consumers
//!
//! Depends only on `typed-event-types` -- never on `typed-event-infra` or any IO crate.

pub mod bus;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod registry;

pub use bus::EventBus;
pub use dispatcher::{Dispatcher, EventPayload};
pub use error::{DispatchError, HandlerFailure};
pub use event::{Event, Handler, HandlerResult, SubscriptionGuard};
pub use registry::EventRegistry;
