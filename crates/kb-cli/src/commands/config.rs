//! Check-config command implementation

use std::path::Path;

use colored::Colorize;
use kb_core::{DatasetTarget, SyncConfig};

use crate::error::Result;

/// Run the check-config command
///
/// Loads and validates the configuration without touching the network.
pub fn run_check_config(config_path: &Path) -> Result<()> {
    let config = SyncConfig::load(config_path)?;

    println!(
        "{} {} is valid",
        "OK".green().bold(),
        config_path.display().to_string().cyan()
    );
    println!(
        "   batch size {}, poll every {}s, timeout {}s",
        config.settings.batch_size,
        config.settings.poll_interval.as_secs(),
        config.settings.indexing_timeout.as_secs()
    );
    println!();

    if config.datasets.is_empty() {
        println!("{} No datasets configured.", "!".yellow().bold());
        return Ok(());
    }

    for spec in &config.datasets {
        let target = match &spec.target {
            DatasetTarget::Id(id) => format!("id {id}"),
            DatasetTarget::Name {
                name,
                create_if_missing: true,
            } => format!("name {name} (created if missing)"),
            DatasetTarget::Name { name, .. } => format!("name {name}"),
        };
        let marker = if spec.path.is_dir() {
            " ".normal()
        } else {
            "!".yellow().bold()
        };
        println!(
            "{} {} {} {}",
            marker,
            spec.path.display(),
            "=>".blue().bold(),
            target
        );
    }

    let missing = config.datasets.iter().filter(|s| !s.path.is_dir()).count();
    if missing > 0 {
        println!();
        println!(
            "{} {} local path(s) do not exist and will be skipped.",
            "!".yellow().bold(),
            missing
        );
    }
    Ok(())
}
