//! Command-line interface

pub mod commands;
pub mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;
use crate::workflow::DEFAULT_LIMIT_SIZE;

#[derive(Parser)]
#[command(name = "dynamics-dedupe")]
#[command(about = "Review and merge duplicate records in Microsoft Dynamics 365")]
#[command(version)]
pub struct Cli {
    /// Path to the config file
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Interactively pick a duplicate, choose field values and merge
    Merge {
        /// Entity logical name (e.g. account)
        entity: String,
        /// Id of the record to deduplicate
        record_id: String,
        /// Number of candidates to skip
        #[arg(long, default_value_t = 0)]
        offset: usize,
        /// Candidates per page; defaults to workflow.limit_size
        #[arg(long)]
        limit: Option<usize>,
    },
    /// List duplicate candidates of a record
    Duplicates {
        entity: String,
        record_id: String,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show the fields that differ between two records
    Compare {
        entity: String,
        /// Pair key: "<candidate-id>--<original-id>"
        pair_key: String,
    },
    /// Inspect or create the config file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Print the config file location
    Path,
    /// Write a starter config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone();

    match cli.command {
        Commands::Config { command } => {
            commands::config::handle_config_command(command, config_path.as_deref())
        }
        Commands::Merge {
            entity,
            record_id,
            offset,
            limit,
        } => {
            let config = Config::load(config_path.as_deref())?;
            let limit = page_size(limit.unwrap_or(config.workflow.limit_size));
            commands::merge::handle_merge_command(&config, &entity, &record_id, offset, limit).await
        }
        Commands::Duplicates {
            entity,
            record_id,
            offset,
            limit,
        } => {
            let config = Config::load(config_path.as_deref())?;
            let limit = page_size(limit.unwrap_or(config.workflow.limit_size));
            commands::duplicates::handle_duplicates_command(&config, &entity, &record_id, offset, limit)
                .await
        }
        Commands::Compare { entity, pair_key } => {
            let config = Config::load(config_path.as_deref())?;
            commands::compare::handle_compare_command(&config, &entity, &pair_key).await
        }
    }
}

/// Effective page size: zero is not a usable page
pub fn page_size(limit: usize) -> usize {
    if limit == 0 { DEFAULT_LIMIT_SIZE } else { limit }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_merge() {
        let cli = Cli::parse_from([
            "dynamics-dedupe",
            "--verbose",
            "merge",
            "account",
            "a1",
            "--limit",
            "50",
        ]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Merge {
                entity,
                record_id,
                offset,
                limit,
            } => {
                assert_eq!(entity, "account");
                assert_eq!(record_id, "a1");
                assert_eq!(offset, 0);
                assert_eq!(limit, Some(50));
            }
            _ => panic!("expected merge"),
        }
    }

    #[test]
    fn test_parse_config_init() {
        let cli = Cli::parse_from(["dynamics-dedupe", "config", "init", "--force"]);
        assert!(matches!(
            cli.command,
            Commands::Config {
                command: ConfigCommands::Init { force: true }
            }
        ));
    }

    #[test]
    fn test_page_size() {
        assert_eq!(page_size(0), DEFAULT_LIMIT_SIZE);
        assert_eq!(page_size(25), 25);
    }
}
