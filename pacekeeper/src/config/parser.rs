//! INI parsing: `Ini` → `ConfigFile`.
//!
//! The single place where INI key names map to struct fields. Unknown
//! sections and keys are ignored.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use ini::{Ini, Properties};

use super::file::{ConfigFile, ConfigFileError};

/// Parse an `Ini` into a `ConfigFile`, overlaying values onto the defaults.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();
    let manager = &mut config.manager;

    // [updates]
    if let Some(section) = ini.section(Some("updates")) {
        let s = Section::new("updates", section);
        if let Some(v) = s.non_negative("speed_threshold")? {
            manager.speed_threshold = v;
        }
        if let Some(v) = s.seconds("min_interval")? {
            manager.min_interval = v;
        }
        if let Some(v) = s.seconds("max_interval")? {
            manager.max_interval = v;
        }
        if let Some(v) = s.seconds("loop_interval")? {
            manager.loop_interval = v;
        }
    }

    // [first_fix]
    if let Some(section) = ini.section(Some("first_fix")) {
        let s = Section::new("first_fix", section);
        if let Some(v) = s.parsed::<u32>("attempts", "expected a positive integer")? {
            manager.first_fix_attempts = v;
        }
        if let Some(v) = s.seconds("poll_interval")? {
            manager.first_fix_poll_interval = v;
        }
    }

    // [background]
    if let Some(section) = ini.section(Some("background")) {
        let s = Section::new("background", section);
        if let Some(v) = s.boolean("allow_updates")? {
            manager.allow_background_updates = v;
        }
    }

    // [distance]
    if let Some(section) = ini.section(Some("distance")) {
        let s = Section::new("distance", section);
        if let Some(v) = s.non_negative("minimum_update")? {
            manager.minimum_update_distance = v;
        }
        if let Some(v) = s.boolean("scaling")? {
            manager.distance_scaling = v;
        }
    }

    // [motion]
    if let Some(section) = ini.section(Some("motion")) {
        let s = Section::new("motion", section);
        if let Some(v) = s.boolean("enabled")? {
            manager.motion_activity = v;
        }
    }

    // [sensor]
    if let Some(section) = ini.section(Some("sensor")) {
        let s = Section::new("sensor", section);
        if let Some(v) = s.parsed(
            "desired_accuracy",
            "expected one of: best, nearest_ten_meters, hundred_meters, kilometer, three_kilometers",
        )? {
            manager.sensor.desired_accuracy = v;
        }
        if let Some(v) = s.non_negative("distance_filter")? {
            manager.sensor.distance_filter = v;
        }
        if let Some(v) = s.parsed(
            "activity_type",
            "expected one of: other, automotive_navigation, fitness, other_navigation",
        )? {
            manager.sensor.activity_type = v;
        }
    }

    // [events]
    if let Some(section) = ini.section(Some("events")) {
        let s = Section::new("events", section);
        if let Some(v) = s.parsed::<usize>("capacity", "expected a positive integer")? {
            manager.event_capacity = v;
        }
    }

    // [logging]
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("directory") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.directory = Some(expand_tilde(v));
            }
        }
    }

    config.manager.validate()?;
    Ok(config)
}

/// Typed accessors over one INI section.
struct Section<'a> {
    name: &'static str,
    props: &'a Properties,
}

impl<'a> Section<'a> {
    fn new(name: &'static str, props: &'a Properties) -> Self {
        Self { name, props }
    }

    fn invalid(&self, key: &str, value: &str, reason: &str) -> ConfigFileError {
        ConfigFileError::InvalidValue {
            section: self.name.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Raw trimmed value; empty values count as absent.
    fn raw(&self, key: &str) -> Option<&'a str> {
        self.props
            .get(key)
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    fn parsed<T: FromStr>(&self, key: &str, reason: &str) -> Result<Option<T>, ConfigFileError> {
        match self.raw(key) {
            None => Ok(None),
            Some(v) => v
                .parse()
                .map(Some)
                .map_err(|_| self.invalid(key, v, reason)),
        }
    }

    fn non_negative(&self, key: &str) -> Result<Option<f64>, ConfigFileError> {
        let reason = "expected a non-negative number";
        match self.parsed::<f64>(key, reason)? {
            Some(v) if !v.is_finite() || v < 0.0 => {
                Err(self.invalid(key, self.raw(key).unwrap_or_default(), reason))
            }
            other => Ok(other),
        }
    }

    /// Seconds, fractional allowed.
    fn seconds(&self, key: &str) -> Result<Option<Duration>, ConfigFileError> {
        let reason = "expected a non-negative number of seconds";
        match self.parsed::<f64>(key, reason)? {
            None => Ok(None),
            Some(v) => Duration::try_from_secs_f64(v)
                .map(Some)
                .map_err(|_| self.invalid(key, self.raw(key).unwrap_or_default(), reason)),
        }
    }

    fn boolean(&self, key: &str) -> Result<Option<bool>, ConfigFileError> {
        match self.raw(key) {
            None => Ok(None),
            Some(v) => match v.to_lowercase().as_str() {
                "true" | "yes" | "1" | "on" => Ok(Some(true)),
                "false" | "no" | "0" | "off" => Ok(Some(false)),
                _ => Err(self.invalid(key, v, "expected true or false")),
            },
        }
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
