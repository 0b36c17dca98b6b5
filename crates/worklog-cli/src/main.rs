//! WorkLog CLI - record work sessions and sync them through DynamoDB
//!
//! Every command works offline against the local database; `worklog sync`
//! reconciles it with the remote tables.

mod cli;
mod commands;
mod error;

#[cfg(test)]
mod tests;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use worklog_core::OwnerId;

use crate::cli::{Cli, Commands};
use crate::commands::common::{resolve_config_path, resolve_db_path};
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::session::run_session;
use crate::commands::sync::run_sync;
use crate::commands::tag::run_tag;
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

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("worklog=info,worklog_core=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let owner = OwnerId::new(cli.owner);

    match cli.command {
        Commands::Tag { command } => {
            let db_path = resolve_db_path(cli.db_path)?;
            run_tag(command, owner, &db_path)?;
        }
        Commands::Session { command } => {
            let db_path = resolve_db_path(cli.db_path)?;
            run_session(command, owner, &db_path)?;
        }
        Commands::Sync { command } => {
            let db_path = resolve_db_path(cli.db_path)?;
            let config_path = resolve_config_path(cli.config)?;
            run_sync(command, owner, &db_path, &config_path).await?;
        }
        Commands::Config { command } => {
            let config_path = resolve_config_path(cli.config)?;
            run_config(command, &config_path)?;
        }
        Commands::Completions { shell, output } => {
            run_completions(shell, output.as_deref())?;
        }
    }

    Ok(())
}
