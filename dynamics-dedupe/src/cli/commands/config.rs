//! `config` subcommands

use anyhow::{Context, Result};
use colored::*;
use std::path::{Path, PathBuf};

use crate::cli::ConfigCommands;
use crate::config::Config;

pub fn handle_config_command(command: ConfigCommands, path: Option<&Path>) -> Result<()> {
    let path: PathBuf = match path {
        Some(p) => p.to_path_buf(),
        None => Config::default_path()?,
    };

    match command {
        ConfigCommands::Path => {
            println!("{}", path.display());
        }
        ConfigCommands::Show => {
            let mut config = Config::load(Some(&path))?;
            if config.environment.client_secret.is_some() {
                config.environment.client_secret = Some("********".to_string());
            }
            let rendered = toml::to_string_pretty(&config).context("Failed to render config")?;
            println!("{}", rendered);
        }
        ConfigCommands::Init { force } => {
            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists: {} (use --force to overwrite)",
                    path.display()
                );
            }
            Config::sample().save(&path)?;
            println!(
                "Wrote starter config to {}",
                path.display().to_string().bright_green()
            );
        }
    }
    Ok(())
}
