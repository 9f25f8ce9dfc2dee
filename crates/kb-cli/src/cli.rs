//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Knowledge Sync - Mirror local markdown folders into knowledge-base datasets
#[derive(Parser, Debug)]
#[command(name = "kbsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the sync configuration (YAML, TOML or JSON)
    #[arg(short, long, global = true, default_value = "kb-sync.yaml")]
    pub config: PathBuf,

    /// Knowledge API base URL
    #[arg(long, global = true, env = "KB_API_URL")]
    pub api_url: Option<String>,

    /// Knowledge API key
    #[arg(long, global = true, env = "KB_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Synchronize every configured dataset
    ///
    /// Creates, updates and deletes remote documents so each dataset matches
    /// its local folder, waiting for indexing after every batch.
    Sync {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Preview what sync would change
    Diff {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Validate the sync configuration without contacting the API
    CheckConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sync_with_json() {
        let cli = Cli::try_parse_from(["kbsync", "sync", "--json"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Sync { json: true }));
        assert_eq!(cli.config, PathBuf::from("kb-sync.yaml"));
    }

    #[test]
    fn global_flags_work_after_subcommand() {
        let cli = Cli::try_parse_from([
            "kbsync",
            "diff",
            "-c",
            "conf/sync.yaml",
            "--api-url",
            "http://localhost:5001",
            "-v",
        ])
        .unwrap();
        assert_eq!(cli.command, Some(Commands::Diff { json: false }));
        assert_eq!(cli.config, PathBuf::from("conf/sync.yaml"));
        assert_eq!(cli.api_url.as_deref(), Some("http://localhost:5001"));
        assert!(cli.verbose);
    }

    #[test]
    fn check_config_uses_kebab_case() {
        let cli = Cli::try_parse_from(["kbsync", "check-config"]).unwrap();
        assert_eq!(cli.command, Some(Commands::CheckConfig));
    }
}
