//! Configuration types for typed-event.
//!
//! `EventConfig` represents the top-level `events.toml`: how dispatch treats
//! failing handlers, the async bus capacity, and events declared by name.

use serde::{Deserialize, Serialize};

use crate::event::EventDescriptor;

/// What dispatch does when a handler returns an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Abort at the first failure; later handlers are not run.
    #[default]
    Stop,
    /// Run every handler and report all failures together.
    Continue,
}

/// Top-level configuration. All fields have sensible defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventConfig {
    #[serde(default)]
    pub dispatch: DispatchConfig,

    #[serde(default)]
    pub bus: BusConfig,

    /// Events declared by name, with their payload schemas.
    #[serde(default)]
    pub events: Vec<EventDescriptor>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchConfig {
    #[serde(default)]
    pub error_policy: ErrorPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    /// Broadcast channel capacity for async consumers.
    #[serde(default = "default_bus_capacity")]
    pub capacity: usize,
}

fn default_bus_capacity() -> usize {
    1024
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            capacity: default_bus_capacity(),
        }
    }
}
