use std::fmt;

use thiserror::Error;
use typed_event_types::error::{RegistryError, SchemaError};
use typed_event_types::subscription::SubscriptionId;

/// Boxed error carried out of a failing handler.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// One handler that failed during a dispatch.
#[derive(Debug)]
pub struct HandlerFailure {
    pub subscription: SubscriptionId,
    /// Index of the handler in registration order at dispatch time.
    pub position: usize,
    pub error: BoxError,
}

impl fmt::Display for HandlerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "handler {} (position {}): {}",
            self.subscription, self.position, self.error
        )
    }
}

/// Errors returned from dispatching an event.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A handler failed and the event stops at the first failure.
    #[error("handler {subscription} (position {position}) failed while dispatching '{event}': {source}")]
    HandlerFailed {
        event: String,
        subscription: SubscriptionId,
        position: usize,
        #[source]
        source: BoxError,
    },

    /// One or more handlers failed and the event runs every handler.
    #[error("{} of {invoked} handlers failed while dispatching '{event}'", .failures.len())]
    HandlersFailed {
        event: String,
        invoked: usize,
        failures: Vec<HandlerFailure>,
    },

    /// The payload does not satisfy the event's schema. No handler ran.
    #[error("payload rejected for event '{event}': {source}")]
    InvalidPayload {
        event: String,
        #[source]
        source: SchemaError,
    },

    /// The payload could not be encoded as JSON. No handler ran.
    #[error("failed to encode payload for event '{event}': {source}")]
    Encode {
        event: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl DispatchError {
    /// Subscriptions whose handlers failed, in dispatch order.
    pub fn failed_subscriptions(&self) -> Vec<SubscriptionId> {
        match self {
            DispatchError::HandlerFailed { subscription, .. } => vec![*subscription],
            DispatchError::HandlersFailed { failures, .. } => {
                failures.iter().map(|f| f.subscription).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Whether the error was raised before any handler ran.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            DispatchError::InvalidPayload { .. }
                | DispatchError::Encode { .. }
                | DispatchError::Registry(_)
        )
    }
}
