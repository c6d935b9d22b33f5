//! Descriptors for events declared by name.
//!
//! An `EventDescriptor` is what a `[[events]]` table in `events.toml` parses
//! into: a name, an optional description and the payload schema.

use serde::{Deserialize, Serialize};

use crate::schema::{FieldSpec, PayloadSchema};

/// A named event type and the schema of its payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDescriptor {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(flatten)]
    pub schema: PayloadSchema,
}

impl EventDescriptor {
    pub fn new(name: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        Self {
            name: name.into(),
            description: None,
            schema: PayloadSchema::new(fields),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_schema(mut self, schema: PayloadSchema) -> Self {
        self.schema = schema;
        self
    }
}

/// Event names are non-empty and contain no whitespace.
pub fn is_valid_event_name(name: &str) -> bool {
    !name.is_empty() && !name.chars().any(char::is_whitespace)
}
