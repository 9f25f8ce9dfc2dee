//! Knowledge Sync CLI
//!
//! The command-line interface for syncing local markdown into knowledge-base
//! datasets.

mod cli;
mod commands;
mod context;
mod error;

use clap::Parser;
use colored::Colorize;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use cli::{Cli, Commands};
use context::Connection;
use error::{CliError, Result};

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let connection = Connection::new(cli.api_url, cli.api_key);
    match cli.command {
        Some(Commands::Sync { json }) => commands::run_sync(&cli.config, &connection, json),
        Some(Commands::Diff { json }) => commands::run_diff(&cli.config, &connection, json),
        Some(Commands::CheckConfig) => commands::run_check_config(&cli.config),
        None => {
            println!("{} Knowledge Sync CLI", "kbsync".green().bold());
            println!();
            println!("Run {} for available commands.", "kbsync --help".cyan());
            Ok(())
        }
    }
}

/// Progress logs go to stderr so `--json` output stays parseable.
fn init_tracing(verbose: bool) -> Result<()> {
    let builder = FmtSubscriber::builder()
        .with_writer(std::io::stderr)
        .with_target(verbose);
    let result = if verbose {
        tracing::subscriber::set_global_default(builder.with_max_level(Level::DEBUG).finish())
    } else {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        tracing::subscriber::set_global_default(builder.with_env_filter(filter).finish())
    };
    result.map_err(|e| CliError::user(format!("Failed to set tracing subscriber: {e}")))?;
    tracing::debug!("Verbose mode enabled");
    Ok(())
}
