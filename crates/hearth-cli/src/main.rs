//! Hearth CLI - the shared map, gallery and work dashboard from a terminal

mod auth;
mod cli;
mod commands;
mod config;
mod error;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::auth_cmd::run_auth;
use crate::commands::calendar::run_calendar;
use crate::commands::completions::run_completions;
use crate::commands::gallery::run_gallery;
use crate::commands::map::run_map;
use crate::commands::share::run_share;
use crate::commands::tasks::run_tasks;
use crate::config::load_config;
use crate::error::CliError;

const LOG_DIRECTIVE: &str = "hearth=info";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let directive = LOG_DIRECTIVE
        .parse()
        .map_err(|error| CliError::Config(format!("Invalid log directive: {error}")))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Completions { shell, output } = &cli.command {
        return run_completions(*shell, output.as_deref());
    }

    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Commands::Auth { command } => run_auth(command, &config).await?,
        Commands::Map { watch, json } => run_map(watch, json, &config).await?,
        Commands::Share { lat, lng } => run_share(lat, lng, &config).await?,
        Commands::Tasks { command } => run_tasks(command, &config).await?,
        Commands::Calendar { command } => run_calendar(command, &config).await?,
        Commands::Gallery { command } => run_gallery(command, &config).await?,
        Commands::Completions { .. } => {}
    }

    Ok(())
}
