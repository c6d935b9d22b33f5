//! Shared types for typed-event.
//!
//! Subscription identifiers, payload schemas and their binding rules, event
//! descriptors, configuration types and the error enums shared by the rest of
//! the workspace.
//!
//! Zero infrastructure dependencies -- only serde, uuid, thiserror.

pub mod config;
pub mod error;
pub mod event;
pub mod schema;
pub mod subscription;
