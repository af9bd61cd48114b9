//! User configuration file at `~/.pacekeeper/config.ini`.
//!
//! Parsing lives in [`parser`], serialization in [`writer`] and key-based
//! access for the CLI in [`keys`].

mod file;
mod keys;
mod parser;
mod writer;

pub use file::{
    config_directory, config_file_path, ConfigFile, ConfigFileError, LoggingSettings,
    CONFIG_FILE_NAME,
};
pub use keys::{ConfigKey, ConfigKeyError};
