//! Manager configuration.

use std::time::Duration;

use crate::error::ConfigError;
use crate::events::DEFAULT_EVENT_CAPACITY;
use crate::first_fix::{DEFAULT_FIRST_FIX_ATTEMPTS, DEFAULT_FIRST_FIX_POLL_INTERVAL};
use crate::source::SensorSettings;
use crate::throttle::{
    ThrottleConfig, TimeIntervalPolicy, DEFAULT_LOOP_INTERVAL, DEFAULT_MAX_INTERVAL,
    DEFAULT_MINIMUM_UPDATE_DISTANCE, DEFAULT_MIN_INTERVAL, DEFAULT_SPEED_THRESHOLD,
};

/// Longest accepted interval or period (one day).
pub const MAX_CONFIGURED_DURATION: Duration = Duration::from_secs(24 * 60 * 60);

/// Tunables for a [`super::LocationManager`].
///
/// # Example
///
/// ```
/// use pacekeeper::ManagerConfig;
/// use std::time::Duration;
///
/// let config = ManagerConfig {
///     min_interval: Duration::from_secs(2),
///     allow_background_updates: true,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ManagerConfig {
    /// Speed in m/s at or above which `min_interval` applies.
    pub speed_threshold: f64,
    pub min_interval: Duration,
    pub max_interval: Duration,
    /// Heartbeat period while running.
    pub loop_interval: Duration,
    /// Polls before the first-fix error is raised.
    pub first_fix_attempts: u32,
    pub first_fix_poll_interval: Duration,
    /// Keep updating while the application is backgrounded.
    pub allow_background_updates: bool,
    /// Distance gate base threshold in meters.
    pub minimum_update_distance: f64,
    /// Grow the distance threshold with speed.
    pub distance_scaling: bool,
    /// Use motion classification to suppress distance accumulation.
    pub motion_activity: bool,
    /// Buffer size of each event channel.
    pub event_capacity: usize,
    pub sensor: SensorSettings,
}

impl ManagerConfig {
    /// Check semantic constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.speed_threshold.is_finite() || self.speed_threshold < 0.0 {
            return Err(ConfigError::InvalidNumber {
                field: "speed_threshold",
                value: self.speed_threshold,
            });
        }
        if self.min_interval.is_zero() {
            return Err(ConfigError::ZeroDuration("min_interval"));
        }
        if self.min_interval > self.max_interval {
            return Err(ConfigError::IntervalOrder {
                min: self.min_interval,
                max: self.max_interval,
            });
        }
        if self.loop_interval.is_zero() {
            return Err(ConfigError::ZeroDuration("loop_interval"));
        }
        if self.first_fix_poll_interval.is_zero() {
            return Err(ConfigError::ZeroDuration("first_fix_poll_interval"));
        }
        for (field, value) in [
            ("min_interval", self.min_interval),
            ("max_interval", self.max_interval),
            ("loop_interval", self.loop_interval),
            ("first_fix_poll_interval", self.first_fix_poll_interval),
        ] {
            if value > MAX_CONFIGURED_DURATION {
                return Err(ConfigError::DurationTooLong {
                    field,
                    value,
                    max: MAX_CONFIGURED_DURATION,
                });
            }
        }
        if self.first_fix_attempts == 0 {
            return Err(ConfigError::ZeroBudget);
        }
        if !self.minimum_update_distance.is_finite() || self.minimum_update_distance < 0.0 {
            return Err(ConfigError::InvalidNumber {
                field: "minimum_update_distance",
                value: self.minimum_update_distance,
            });
        }
        if !self.sensor.distance_filter.is_finite() || self.sensor.distance_filter < 0.0 {
            return Err(ConfigError::InvalidNumber {
                field: "distance_filter",
                value: self.sensor.distance_filter,
            });
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(())
    }

    pub fn interval_policy(&self) -> TimeIntervalPolicy {
        TimeIntervalPolicy::new(self.min_interval, self.max_interval, self.speed_threshold)
    }

    pub(crate) fn throttle_config(&self) -> ThrottleConfig {
        ThrottleConfig {
            policy: self.interval_policy(),
            loop_interval: self.loop_interval,
            minimum_update_distance: self.minimum_update_distance,
            distance_scaling: self.distance_scaling,
        }
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            speed_threshold: DEFAULT_SPEED_THRESHOLD,
            min_interval: DEFAULT_MIN_INTERVAL,
            max_interval: DEFAULT_MAX_INTERVAL,
            loop_interval: DEFAULT_LOOP_INTERVAL,
            first_fix_attempts: DEFAULT_FIRST_FIX_ATTEMPTS,
            first_fix_poll_interval: DEFAULT_FIRST_FIX_POLL_INTERVAL,
            allow_background_updates: false,
            minimum_update_distance: DEFAULT_MINIMUM_UPDATE_DISTANCE,
            distance_scaling: false,
            motion_activity: false,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            sensor: SensorSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ManagerConfig::default();
        assert_eq!(config.speed_threshold, 0.4);
        assert_eq!(config.min_interval, Duration::from_secs(5));
        assert_eq!(config.max_interval, Duration::from_secs(300));
        assert_eq!(config.loop_interval, Duration::from_secs(5));
        assert_eq!(config.first_fix_attempts, 5);
        assert_eq!(config.first_fix_poll_interval, Duration::from_secs(1));
        assert!(!config.allow_background_updates);
        assert_eq!(config.minimum_update_distance, 50.0);
        assert!(!config.distance_scaling);
        assert!(!config.motion_activity);
        assert_eq!(config.event_capacity, 256);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_interval_order() {
        let config = ManagerConfig {
            min_interval: Duration::from_secs(10),
            max_interval: Duration::from_secs(5),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::IntervalOrder { .. })
        ));
    }

    #[test]
    fn test_validate_zero_values() {
        let config = ManagerConfig {
            first_fix_attempts: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroBudget));

        let config = ManagerConfig {
            loop_interval: Duration::ZERO,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroDuration("loop_interval"))
        );
    }

    #[test]
    fn test_validate_negative_distance() {
        let config = ManagerConfig {
            minimum_update_distance: -5.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidNumber {
                field: "minimum_update_distance",
                ..
            })
        ));
    }

    #[test]
    fn test_equal_intervals_are_valid() {
        let config = ManagerConfig {
            min_interval: Duration::from_secs(30),
            max_interval: Duration::from_secs(30),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_durations_past_limit() {
        let config = ManagerConfig {
            max_interval: Duration::from_secs(u64::MAX / 2),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DurationTooLong {
                field: "max_interval",
                ..
            })
        ));

        let config = ManagerConfig {
            first_fix_poll_interval: MAX_CONFIGURED_DURATION + Duration::from_secs(1),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DurationTooLong {
                field: "first_fix_poll_interval",
                ..
            })
        ));

        let config = ManagerConfig {
            max_interval: MAX_CONFIGURED_DURATION,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
