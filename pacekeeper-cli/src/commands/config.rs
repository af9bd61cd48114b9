//! Configuration management CLI commands.
//!
//! `config get`, `config set`, `config list`, `config path` and
//! `config init` for viewing and editing `~/.pacekeeper/config.ini`.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use pacekeeper::config::{config_file_path, ConfigFile, ConfigKey};

use crate::error::CliError;

/// Arguments shared by every config subcommand.
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Configuration file to operate on (defaults to the user configuration)
    #[arg(long, global = true)]
    pub file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: ConfigCommands,
}

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Get a configuration value
    Get {
        /// Configuration key in format section.key (e.g., updates.min_interval)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key in format section.key (e.g., updates.min_interval)
        key: String,

        /// Value to set
        value: String,
    },

    /// List all configuration settings
    List,

    /// Show the configuration file path
    Path,

    /// Write a configuration file with every default spelled out
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Run a config subcommand.
pub fn run(args: ConfigArgs) -> Result<(), CliError> {
    let path = args.file.unwrap_or_else(config_file_path);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match args.command {
        ConfigCommands::Get { key } => run_get(&mut out, &path, &key),
        ConfigCommands::Set { key, value } => run_set(&mut out, &path, &key, &value),
        ConfigCommands::List => run_list(&mut out, &path),
        ConfigCommands::Path => writeln!(out, "{}", path.display()).map_err(CliError::Output),
        ConfigCommands::Init { force } => run_init(&mut out, &path, force),
    }
}

fn parse_key(key: &str) -> Result<ConfigKey, CliError> {
    key.parse().map_err(|_| {
        CliError::Config(format!(
            "Unknown configuration key '{}'. Use 'pacekeeper config list' to see available keys.",
            key
        ))
    })
}

fn run_get(out: &mut impl Write, path: &Path, key: &str) -> Result<(), CliError> {
    let config_key = parse_key(key)?;
    let config = ConfigFile::load_from(path)?;
    let value = config_key.get(&config);

    if value.is_empty() {
        writeln!(out, "(not set)").map_err(CliError::Output)
    } else {
        writeln!(out, "{}", value).map_err(CliError::Output)
    }
}

fn run_set(out: &mut impl Write, path: &Path, key: &str, value: &str) -> Result<(), CliError> {
    let config_key = parse_key(key)?;
    let mut config = ConfigFile::load_from(path)?;
    config_key
        .set(&mut config, value)
        .map_err(|e| CliError::Config(e.to_string()))?;
    config.save_to(path)?;

    tracing::info!(key = %config_key, value, path = %path.display(), "Configuration updated");
    writeln!(out, "Set {} = {}", config_key, value).map_err(CliError::Output)
}

fn run_list(out: &mut impl Write, path: &Path) -> Result<(), CliError> {
    let config = ConfigFile::load_from(path)?;
    write_listing(out, &config).map_err(CliError::Output)
}

fn write_listing(out: &mut impl Write, config: &ConfigFile) -> io::Result<()> {
    writeln!(out, "Configuration Settings")?;
    writeln!(out, "======================")?;

    let mut current_section = "";
    for key in ConfigKey::all() {
        if key.section() != current_section {
            writeln!(out)?;
            writeln!(out, "[{}]", key.section())?;
            current_section = key.section();
        }

        let value = key.get(config);
        if value.is_empty() {
            writeln!(out, "  {} = (not set)", key.key_name())?;
        } else {
            writeln!(out, "  {} = {}", key.key_name(), value)?;
        }
    }
    Ok(())
}

fn run_init(out: &mut impl Write, path: &Path, force: bool) -> Result<(), CliError> {
    if path.exists() && !force {
        return Err(CliError::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    ConfigFile::default().save_to(path)?;
    writeln!(out, "Wrote default configuration to {}", path.display()).map_err(CliError::Output)
}
