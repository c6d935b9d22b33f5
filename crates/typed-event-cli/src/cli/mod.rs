//! CLI command definitions and dispatch for the `tevent` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod demo;
pub mod events;
pub mod payload;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Declare, inspect and dispatch typed events.
#[derive(Parser)]
#[command(name = "tevent", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Write log lines to stderr as JSON.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    /// Read events from this file instead of `$TYPED_EVENT_HOME/events.toml`.
    #[arg(long, global = true, env = "TYPED_EVENT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the user-login walkthrough: typed dispatch, then a rejected payload.
    Demo {
        /// User name carried by the login event.
        #[arg(long, default_value = "Alice")]
        username: String,

        /// User id carried by the login event.
        #[arg(long, default_value_t = 42)]
        user_id: u64,
    },

    /// List events declared in the config file.
    #[command(alias = "ls")]
    Events,

    /// Validate a JSON payload against an event's schema without dispatching.
    Check {
        /// Declared event name.
        event: String,

        /// JSON array (positional) or object (by field name).
        payload: String,
    },

    /// Validate a JSON payload and dispatch it, echoing what was delivered.
    Dispatch {
        /// Declared event name.
        event: String,

        /// JSON array (positional) or object (by field name).
        payload: String,

        /// Override `[bus] capacity` from events.toml (minimum 16).
        #[arg(long)]
        bus_capacity: Option<usize>,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}
