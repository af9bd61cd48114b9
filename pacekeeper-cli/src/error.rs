//! CLI error handling with user-friendly messages.

use std::fmt;
use std::path::PathBuf;
use std::process;

use pacekeeper::config::ConfigFileError;
use pacekeeper::{ConfigError, ManagerError};

/// CLI-specific errors.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Manager settings rejected
    Settings(ConfigError),
    /// Session setup failed
    Session(ManagerError),
    /// Failed to read the trace
    TraceRead { path: PathBuf, error: std::io::Error },
    /// Malformed trace line
    TraceParse { line: usize, message: String },
    /// Failed to write event output
    Output(std::io::Error),
}

impl CliError {
    /// Exit the process with an error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        if let CliError::TraceParse { .. } = self {
            eprintln!();
            eprintln!("Each trace line is one JSON object, for example:");
            eprintln!(r#"  {{"at_ms": 0, "type": "start"}}"#);
            eprintln!(r#"  {{"at_ms": 1000, "type": "fix", "lat": 53.55, "lon": 9.99, "speed": 1.4}}"#);
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Settings(e) => write!(f, "Invalid manager settings: {}", e),
            CliError::Session(e) => write!(f, "Session error: {}", e),
            CliError::TraceRead { path, error } => {
                write!(f, "Failed to read trace '{}': {}", path.display(), error)
            }
            CliError::TraceParse { line, message } => {
                write!(f, "Trace line {}: {}", line, message)
            }
            CliError::Output(e) => write!(f, "Failed to write output: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Settings(e) => Some(e),
            CliError::Session(e) => Some(e),
            CliError::TraceRead { error, .. } => Some(error),
            CliError::Output(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<ManagerError> for CliError {
    fn from(e: ManagerError) -> Self {
        CliError::Session(e)
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Settings(e)
    }
}
