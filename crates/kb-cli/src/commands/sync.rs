//! Sync command implementation

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use colored::Colorize;
use kb_core::{SyncConfig, SyncEngine, SyncResult};
use kb_remote::TokioClock;
use serde::Serialize;
use serde_json::json;

use super::block_on;
use crate::context::Connection;
use crate::error::{CliError, Result};

/// Totals across every dataset in a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub deleted: usize,
    pub errors: usize,
}

impl SyncSummary {
    pub fn from_results(results: &[SyncResult]) -> Self {
        results.iter().fold(Self::default(), |mut acc, r| {
            acc.created += r.created;
            acc.updated += r.updated;
            acc.unchanged += r.skipped;
            acc.deleted += r.deleted;
            acc.errors += r.errors.len();
            acc
        })
    }
}

impl fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Sync complete: {} created, {} updated, {} unchanged, {} deleted",
            self.created, self.updated, self.unchanged, self.deleted
        )
    }
}

/// Run the sync command
///
/// Exits non-zero when any dataset recorded an error.
pub fn run_sync(config_path: &Path, connection: &Connection, json: bool) -> Result<()> {
    let config = SyncConfig::load(config_path)?;
    let store = connection.store()?;
    let engine = SyncEngine::from_settings(store, Arc::new(TokioClock), &config.settings);

    tracing::info!(datasets = config.datasets.len(), "Starting sync");
    let results = block_on(engine.run(&config.datasets))?;
    let summary = SyncSummary::from_results(&results);

    if json {
        let output = json!({
            "summary": summary,
            "results": results,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_human(&results, &summary);
    }

    let failed = results.iter().filter(|r| r.has_errors()).count();
    if failed > 0 {
        return Err(CliError::user(format!(
            "{failed} dataset(s) finished with errors"
        )));
    }
    Ok(())
}

fn print_human(results: &[SyncResult], summary: &SyncSummary) {
    for result in results {
        let id = result.dataset_id.as_deref().unwrap_or("-");
        println!(
            "{} {} ({}) {}",
            "=>".blue().bold(),
            result.dataset.bold(),
            id,
            result.path.display()
        );
        if result.is_path_missing() {
            println!("   {} skipped, local path is missing", "!".yellow().bold());
        } else {
            println!(
                "   {} created, {} updated, {} unchanged, {} deleted",
                result.created, result.updated, result.skipped, result.deleted
            );
        }
        for warning in &result.warnings {
            println!("   {} {}", "!".yellow().bold(), warning);
        }
        for error in &result.errors {
            println!("   {} {}", "x".red().bold(), error);
        }
    }

    println!();
    if summary.errors == 0 {
        println!("{} {}", "OK".green().bold(), summary);
    } else {
        println!(
            "{} {} ({} error(s))",
            "!".yellow().bold(),
            summary,
            summary.errors
        );
    }
}
