//! Error types for API precondition failures.
//!
//! Runtime conditions (missing permission, no first fix) are reported as
//! events, not through these types.

use std::time::Duration;

use thiserror::Error;

/// Operations the manager refuses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManagerError {
    /// An external observer is already registered.
    #[error("an external location observer is already registered")]
    ObserverAlreadyRegistered,

    /// The manager was destroyed.
    #[error("location manager has been destroyed")]
    Destroyed,
}

/// Semantic problems in a [`crate::ManagerConfig`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("minimum interval {min:?} exceeds maximum interval {max:?}")]
    IntervalOrder { min: Duration, max: Duration },

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("{field} of {value:?} exceeds the limit of {max:?}")]
    DurationTooLong {
        field: &'static str,
        value: Duration,
        max: Duration,
    },

    #[error("first-fix attempt budget must be at least 1")]
    ZeroBudget,

    #[error("{field} must be a finite, non-negative number (got {value})")]
    InvalidNumber { field: &'static str, value: f64 },

    #[error("event channel capacity must be at least 1")]
    ZeroCapacity,
}

/// Failures talking to a running session driver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// The driver task has exited.
    #[error("session driver has stopped")]
    Stopped,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_messages() {
        let err = ConfigError::IntervalOrder {
            min: Duration::from_secs(10),
            max: Duration::from_secs(5),
        };
        assert!(err.to_string().contains("exceeds"));

        let err = ConfigError::InvalidNumber {
            field: "minimum_update_distance",
            value: -1.0,
        };
        assert!(err.to_string().contains("minimum_update_distance"));
    }
}
