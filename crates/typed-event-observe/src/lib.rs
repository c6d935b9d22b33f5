//! Observability setup for typed-event binaries.
//!
//! Installs the global `tracing` subscriber, optionally bridged to
//! OpenTelemetry.

pub mod tracing_setup;
