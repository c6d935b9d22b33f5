//! Infrastructure layer for typed-event.
//!
//! Locates the data directory and loads `events.toml` into the configuration
//! types defined in `typed-event-types`, then builds the registry from it.

pub mod config;
pub mod paths;
