//! Speed-dependent update interval selection.
//!
//! Reference speed bands (m/s), for choosing a threshold:
//!
//! | Activity | Speed |
//! |----------|-------|
//! | standing | 0 |
//! | walking  | 0.3 to 1.4 |
//! | running  | 1.4 to 4 |
//! | cycling  | 4 to 12 |

use std::time::Duration;

/// Default minimum interval, used while moving.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(5);

/// Default maximum interval, used while slow or stationary.
pub const DEFAULT_MAX_INTERVAL: Duration = Duration::from_secs(300);

/// Default speed at which the short interval kicks in (m/s).
pub const DEFAULT_SPEED_THRESHOLD: f64 = 0.4;

/// Chooses between a short and a long update interval by speed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeIntervalPolicy {
    pub min: Duration,
    pub max: Duration,
    /// Speed in m/s at or above which `min` applies.
    pub speed_threshold: f64,
}

impl TimeIntervalPolicy {
    pub fn new(min: Duration, max: Duration, speed_threshold: f64) -> Self {
        Self {
            min,
            max,
            speed_threshold,
        }
    }

    /// Interval to use for a sample moving at `speed`.
    ///
    /// Unknown or zero speed selects `max`.
    pub fn select(&self, speed: Option<f64>) -> Duration {
        match speed {
            Some(speed) if speed >= self.speed_threshold && speed > 0.0 => self.min,
            _ => self.max,
        }
    }
}

impl Default for TimeIntervalPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL, DEFAULT_MAX_INTERVAL, DEFAULT_SPEED_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fast_selects_min() {
        let policy = TimeIntervalPolicy::default();
        assert_eq!(policy.select(Some(2.0)), Duration::from_secs(5));
        assert_eq!(policy.select(Some(0.4)), Duration::from_secs(5));
    }

    #[test]
    fn test_slow_or_unknown_selects_max() {
        let policy = TimeIntervalPolicy::default();
        assert_eq!(policy.select(Some(0.39)), Duration::from_secs(300));
        assert_eq!(policy.select(Some(0.0)), Duration::from_secs(300));
        assert_eq!(policy.select(None), Duration::from_secs(300));
    }

    #[test]
    fn test_zero_threshold_still_requires_movement() {
        let policy = TimeIntervalPolicy::new(Duration::from_secs(1), Duration::from_secs(10), 0.0);
        assert_eq!(policy.select(Some(0.0)), Duration::from_secs(10));
        assert_eq!(policy.select(Some(0.1)), Duration::from_secs(1));
    }
}
