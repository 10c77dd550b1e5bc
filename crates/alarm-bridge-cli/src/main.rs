//! alarm-bridge - Developer harness for the alarm bridge
//!
//! Runs the bridge against an in-memory alarm capability and speaks
//! newline-delimited JSON on stdin/stdout.

mod cli;
mod commands;
mod error;


use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::completions::run_completions;
use crate::commands::config::{load_config, resolve_config_path, run_config};
use crate::commands::serve::run_serve;
use crate::error::CliError;

const DEFAULT_LOG_FILTER: &str = "alarm_bridge=info,alarm_bridge_core=info";

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
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            prompt_answer,
            no_events,
        } => {
            let path = resolve_config_path(cli.config)?;
            let config = load_config(&path)?;
            run_serve(config, prompt_answer.into(), !no_events).await?;
        }
        Commands::Config { command } => {
            let path = resolve_config_path(cli.config)?;
            run_config(command, &path)?;
        }
        Commands::Completions { shell, output } => {
            run_completions(shell.into(), output.as_deref())?;
        }
    }

    Ok(())
}
