//! Diff command implementation

use std::path::Path;
use std::sync::Arc;

use colored::Colorize;
use kb_core::{DatasetPlan, DiffEntry, SyncConfig, SyncEngine};
use kb_remote::TokioClock;
use serde_json::json;

use super::block_on;
use crate::context::Connection;
use crate::error::Result;

/// Run the diff command
///
/// Resolves datasets and lists remote documents, but never writes.
pub fn run_diff(config_path: &Path, connection: &Connection, json: bool) -> Result<()> {
    let config = SyncConfig::load(config_path)?;
    let store = connection.store()?;
    let engine = SyncEngine::from_settings(store, Arc::new(TokioClock), &config.settings);

    let plans = block_on(engine.plan(&config.datasets))?;

    if json {
        let output = json!({
            "has_changes": plans.iter().any(|p| p.plan.has_changes()),
            "datasets": plans,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_human(&plans);
    }
    Ok(())
}

fn print_human(plans: &[DatasetPlan]) {
    println!("{}", "Diff".blue().bold());
    println!();

    let mut any_changes = false;
    for plan in plans {
        let id = plan.dataset_id.as_deref().unwrap_or("new");
        println!(
            "{} {} ({}) {}",
            "=>".blue().bold(),
            plan.dataset.bold(),
            id,
            plan.path.display()
        );

        if let Some(error) = &plan.error {
            println!("   {} {}", "x".red().bold(), error);
            println!();
            continue;
        }
        for warning in &plan.warnings {
            println!("   {} {}", "!".yellow().bold(), warning);
        }

        let diff = &plan.plan;
        if !diff.has_changes() {
            println!(
                "   {} Up to date ({} unchanged)",
                "OK".green().bold(),
                diff.skips.len()
            );
            println!();
            continue;
        }
        any_changes = true;

        print_entries(&diff.creates, "+".green().bold());
        print_entries(&diff.updates, "~".yellow().bold());
        print_entries(&diff.deletes, "-".red().bold());
        if !diff.skips.is_empty() {
            println!("   {} unchanged", diff.skips.len());
        }
        println!();
    }

    if any_changes {
        println!("Run {} to apply these changes.", "kbsync sync".cyan());
    }
}

fn print_entries(entries: &[DiffEntry], marker: colored::ColoredString) {
    for entry in entries {
        match &entry.reason {
            Some(reason) => println!("   {} {} ({})", marker, entry.filename, reason),
            None => println!("   {} {}", marker, entry.filename),
        }
    }
}
