//! typed-event CLI entry point.
//!
//! Binary name: `tevent`
//!
//! Parses CLI arguments, sets up tracing, loads `events.toml`, then
//! dispatches to the appropriate command handler.

mod cli;
mod state;

use clap::Parser;
use clap_complete::generate;
use typed_event_observe::tracing_setup::{LogFormat, TracingConfig, init_tracing};

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let format = if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::Text
    };
    let tracing_config = TracingConfig::from_verbosity(cli.verbose, cli.quiet)
        .with_format(format)
        .with_otel(cli.otel);
    let _tracing = init_tracing(&tracing_config)?;

    run(cli).await
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Neither completions nor the demo read events.toml
    match &cli.command {
        Commands::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            generate(*shell, &mut cmd, "tevent", &mut std::io::stdout());
            return Ok(());
        }
        Commands::Demo { username, user_id } => {
            let report = cli::demo::run_demo(username, *user_id)?;
            if !cli.quiet || cli.json {
                cli::demo::print_demo(&report, cli.json)?;
            }
            return Ok(());
        }
        _ => {}
    }

    let state = AppState::init(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Events => {
            cli::events::list_events(&state, cli.json)?;
        }

        Commands::Check { event, payload } => {
            cli::payload::run_check(&state, &event, &payload, cli.json, cli.quiet)?;
        }

        Commands::Dispatch {
            event,
            payload,
            bus_capacity,
        } => {
            cli::payload::run_dispatch(
                &state,
                &event,
                &payload,
                bus_capacity,
                cli.json,
                cli.quiet,
            )?;
        }

        Commands::Completions { .. } | Commands::Demo { .. } => unreachable!("handled above"),
    }

    Ok(())
}
