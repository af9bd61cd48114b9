//! Pacekeeper CLI
//!
//! Replays recorded location traces through the update policy and manages
//! the configuration file.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pacekeeper::config::ConfigFile;
use pacekeeper::logging::{init_logging, LoggingGuard, DEFAULT_LOG_FILE};

use commands::config::ConfigArgs;
use commands::simulate::SimulateArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "pacekeeper")]
#[command(version, about = "Adaptive location update policy", long_about = None)]
struct Cli {
    /// Also write logs to DIR/pacekeeper.log (overrides [logging] directory)
    #[arg(long, global = true, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a JSON-lines trace and print the emitted events
    Simulate(SimulateArgs),

    /// View or edit the configuration file
    Config(ConfigArgs),
}

fn main() {
    let cli = Cli::parse();

    let _guard = match setup_logging(&cli) {
        Ok(guard) => guard,
        Err(e) => e.exit(),
    };

    let result = match cli.command {
        Commands::Simulate(args) => commands::simulate::run(args),
        Commands::Config(args) => commands::config::run(args),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "Command failed");
        e.exit();
    }
}

fn setup_logging(cli: &Cli) -> Result<LoggingGuard, CliError> {
    let log_dir = match &cli.log_dir {
        Some(dir) => Some(dir.clone()),
        // A broken config file is reported by the command itself
        None => ConfigFile::load().ok().and_then(|c| c.logging.directory),
    };
    let level = if cli.verbose { "debug" } else { "warn" };

    init_logging(level, log_dir.as_deref(), DEFAULT_LOG_FILE)
        .map_err(|e| CliError::LoggingInit(e.to_string()))
}
