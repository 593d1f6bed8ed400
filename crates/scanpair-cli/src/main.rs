//! scanpair CLI - Pair station and merchandise scans from the terminal
//!
//! Codes are read from a scanner acting as a keyboard (or typed), stored
//! locally and pushed to the backend whenever it is reachable.

mod cli;
mod commands;
mod config_file;
mod error;

use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::capture::run_capture;
use crate::commands::config::run_config;
use crate::commands::daemon::run_daemon;
use crate::commands::pair::{resolve_merchandise, run_pair};
use crate::commands::selectors::run_selectors;
use crate::commands::status::run_status;
use crate::commands::sync::run_sync;
use crate::config_file::{load_config, resolve_config_path, resolve_db_path};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let directive = "scanpair=info"
        .parse()
        .map_err(|error| CliError::Config(format!("Invalid log directive: {error}")))?;
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(directive))
        .init();

    let cli = Cli::parse();
    let config_path = resolve_config_path(cli.config)?;

    let command = match cli.command {
        Commands::Config { command } => return run_config(command, &config_path),
        command => command,
    };

    let config = load_config(&config_path)?;
    let db_path = resolve_db_path(cli.db_path)?;

    match command {
        Commands::Capture { offline } => run_capture(offline, &config, &db_path).await?,
        Commands::Pair {
            station,
            merchandise,
            client,
            flower_type,
            variety,
            no_sync,
        } => {
            let merchandise = resolve_merchandise(merchandise, client, flower_type, variety)?;
            run_pair(&station, merchandise, no_sync, &config, &db_path).await?;
        }
        Commands::Status { limit, json } => {
            let limit = limit.unwrap_or(config.recent_records_limit);
            run_status(limit, json, &db_path).await?;
        }
        Commands::Sync { references } => run_sync(references, &config, &db_path).await?,
        Commands::Selectors {
            kind,
            refresh,
            json,
        } => {
            run_selectors(kind, refresh, json, &config, &db_path).await?;
        }
        Commands::Daemon => run_daemon(&config, &db_path).await?,
        Commands::Config { .. } => {}
    }

    Ok(())
}
