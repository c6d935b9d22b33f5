use thiserror::Error;

use crate::schema::FieldType;
use crate::subscription::SubscriptionId;

/// A payload did not satisfy its event's schema, or a schema is itself
/// malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("payload must be a JSON object or array, got {found}")]
    InvalidPayload { found: &'static str },

    #[error("too many positional values: expected at most {expected}, got {found}")]
    TooManyValues { expected: usize, found: usize },

    #[error("missing required field '{0}'")]
    MissingField(String),

    #[error("field '{0}' given both positionally and by name")]
    MultipleValues(String),

    #[error("unexpected field '{0}'")]
    UnexpectedField(String),

    #[error("field '{field}' expects {expected}, got {found}")]
    TypeMismatch {
        field: String,
        expected: FieldType,
        found: &'static str,
    },

    #[error("field '{0}' is declared more than once")]
    DuplicateField(String),
}

/// Errors from removing a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscriptionError {
    #[error("subscription {id} is not registered on event '{event}'")]
    NotSubscribed { event: String, id: SubscriptionId },

    #[error("handler is not subscribed to event '{0}'")]
    HandlerNotSubscribed(String),
}

/// Errors from the name-keyed event registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("event '{0}' is not declared")]
    UnknownEvent(String),

    #[error("event '{0}' is already declared")]
    DuplicateEvent(String),

    #[error("invalid event name: '{0}'")]
    InvalidName(String),

    #[error("invalid schema for event '{event}': {source}")]
    InvalidSchema {
        event: String,
        #[source]
        source: SchemaError,
    },

    #[error(transparent)]
    Subscription(#[from] SubscriptionError),
}
