//! Key-based access to configuration values (`section.key`).
//!
//! Setting a value re-parses the whole file so the same validation applies
//! as when loading from disk.

use std::str::FromStr;

use ini::Ini;
use thiserror::Error;

use super::file::{ConfigFile, ConfigFileError};

/// Errors from getting or setting a value by key.
#[derive(Debug, Error)]
pub enum ConfigKeyError {
    #[error("Unknown configuration key '{0}'")]
    UnknownKey(String),

    #[error(transparent)]
    Invalid(#[from] ConfigFileError),
}

const KNOWN_KEYS: &[(&str, &str)] = &[
    ("updates", "speed_threshold"),
    ("updates", "min_interval"),
    ("updates", "max_interval"),
    ("updates", "loop_interval"),
    ("first_fix", "attempts"),
    ("first_fix", "poll_interval"),
    ("background", "allow_updates"),
    ("distance", "minimum_update"),
    ("distance", "scaling"),
    ("motion", "enabled"),
    ("sensor", "desired_accuracy"),
    ("sensor", "distance_filter"),
    ("sensor", "activity_type"),
    ("events", "capacity"),
    ("logging", "directory"),
];

/// A known configuration key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigKey {
    section: &'static str,
    key: &'static str,
}

impl ConfigKey {
    /// Every supported key, in file order.
    pub fn all() -> impl Iterator<Item = ConfigKey> {
        KNOWN_KEYS
            .iter()
            .map(|&(section, key)| ConfigKey { section, key })
    }

    pub fn section(&self) -> &'static str {
        self.section
    }

    pub fn key_name(&self) -> &'static str {
        self.key
    }

    /// Current value as written to the file.
    pub fn get(&self, config: &ConfigFile) -> String {
        Ini::load_from_str(&config.to_ini_string())
            .ok()
            .and_then(|ini| {
                ini.get_from(Some(self.section), self.key)
                    .map(|v| v.trim().to_string())
            })
            .unwrap_or_default()
    }

    /// Replace the value, validating the resulting configuration.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigKeyError> {
        let mut ini = Ini::load_from_str(&config.to_ini_string())
            .map_err(|e| ConfigFileError::ReadError(ini::Error::Parse(e)))?;
        ini.with_section(Some(self.section)).set(self.key, value.trim());

        let mut buf = Vec::new();
        ini.write_to(&mut buf)
            .map_err(|e| ConfigFileError::WriteError(e.to_string()))?;
        let text = String::from_utf8_lossy(&buf);

        *config = ConfigFile::from_ini_str(&text)?;
        Ok(())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        ConfigKey::all()
            .find(|k| format!("{}.{}", k.section, k.key) == lowered)
            .ok_or_else(|| ConfigKeyError::UnknownKey(s.to_string()))
    }
}

impl std::fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.section, self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_parse_key() {
        let key: ConfigKey = "updates.min_interval".parse().unwrap();
        assert_eq!(key.section(), "updates");
        assert_eq!(key.key_name(), "min_interval");
        assert_eq!(key.to_string(), "updates.min_interval");

        assert!(matches!(
            "updates.nope".parse::<ConfigKey>(),
            Err(ConfigKeyError::UnknownKey(_))
        ));
    }

    #[test]
    fn test_get_reads_defaults() {
        let config = ConfigFile::default();
        let key: ConfigKey = "first_fix.attempts".parse().unwrap();
        assert_eq!(key.get(&config), "5");

        let key: ConfigKey = "logging.directory".parse().unwrap();
        assert_eq!(key.get(&config), "");
    }

    #[test]
    fn test_set_updates_config() {
        let mut config = ConfigFile::default();
        let key: ConfigKey = "updates.loop_interval".parse().unwrap();
        key.set(&mut config, "12").unwrap();
        assert_eq!(config.manager.loop_interval, Duration::from_secs(12));
    }

    #[test]
    fn test_set_rejects_invalid_and_keeps_config() {
        let mut config = ConfigFile::default();
        let key: ConfigKey = "first_fix.attempts".parse().unwrap();
        assert!(key.set(&mut config, "lots").is_err());
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_all_keys_resolve_against_defaults() {
        let config = ConfigFile::default();
        for key in ConfigKey::all() {
            if key.section() != "logging" {
                assert!(!key.get(&config).is_empty(), "{key} has no value");
            }
        }
    }
}
