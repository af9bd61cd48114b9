//! Location sample value type.

use chrono::{DateTime, Utc};
use geo::{Distance, Haversine, Point};
use serde::{Deserialize, Serialize};

/// A geographic coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl Coordinate {
    /// Create a new coordinate.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance to `other` in meters.
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        let a = Point::new(self.longitude, self.latitude);
        let b = Point::new(other.longitude, other.latitude);
        Haversine::distance(a, b)
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

/// A single fix reported by the platform location source.
///
/// Samples are immutable once produced. Speed is in meters per second and is
/// `None` when the platform could not determine it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    /// Reported position.
    pub coordinate: Coordinate,
    /// When the platform produced the fix.
    pub timestamp: DateTime<Utc>,
    /// Instantaneous speed in m/s, if known.
    pub speed: Option<f64>,
    /// Horizontal accuracy radius in meters.
    pub horizontal_accuracy: f64,
}

impl LocationSample {
    /// Create a sample at `latitude`/`longitude` stamped with the current time.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            coordinate: Coordinate::new(latitude, longitude),
            timestamp: Utc::now(),
            speed: None,
            horizontal_accuracy: 0.0,
        }
    }

    /// Set the instantaneous speed.
    ///
    /// Negative values are how platforms report "unknown" and are stored as `None`.
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = if speed.is_finite() && speed >= 0.0 {
            Some(speed)
        } else {
            None
        };
        self
    }

    /// Set the horizontal accuracy.
    pub fn with_accuracy(mut self, meters: f64) -> Self {
        self.horizontal_accuracy = meters;
        self
    }

    /// Set the fix timestamp.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Latitude in degrees.
    pub fn latitude(&self) -> f64 {
        self.coordinate.latitude
    }

    /// Longitude in degrees.
    pub fn longitude(&self) -> f64 {
        self.coordinate.longitude
    }

    /// Great-circle distance to `other` in meters.
    pub fn distance_to(&self, other: &LocationSample) -> f64 {
        self.coordinate.distance_to(&other.coordinate)
    }

    /// Speed estimated from the displacement since `previous`.
    ///
    /// Returns `None` when the timestamps are not strictly increasing.
    pub fn speed_since(&self, previous: &LocationSample) -> Option<f64> {
        let elapsed = (self.timestamp - previous.timestamp).num_milliseconds();
        if elapsed <= 0 {
            return None;
        }
        Some(self.distance_to(previous) / (elapsed as f64 / 1000.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_negative_speed_is_unknown() {
        let sample = LocationSample::new(53.5, 10.0).with_speed(-1.0);
        assert_eq!(sample.speed, None);

        let sample = LocationSample::new(53.5, 10.0).with_speed(f64::NAN);
        assert_eq!(sample.speed, None);

        let sample = LocationSample::new(53.5, 10.0).with_speed(2.5);
        assert_eq!(sample.speed, Some(2.5));
    }

    #[test]
    fn test_distance_one_degree_latitude() {
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(1.0, 0.0);
        let d = a.distance_to(&b);
        // ~111.2 km per degree of latitude
        assert!((d - 111_195.0).abs() < 200.0, "got {d}");
    }

    #[test]
    fn test_distance_is_symmetric_and_zero_for_same_point() {
        let a = LocationSample::new(53.55, 9.99);
        let b = LocationSample::new(53.56, 10.01);
        assert!((a.distance_to(&b) - b.distance_to(&a)).abs() < 1e-6);
        assert_eq!(a.distance_to(&a), 0.0);
    }

    #[test]
    fn test_speed_since_previous() {
        let t0 = Utc::now();
        let a = LocationSample::new(0.0, 0.0).at(t0);
        let b = LocationSample::new(0.001, 0.0).at(t0 + Duration::seconds(10));

        let speed = b.speed_since(&a).unwrap();
        // ~111 m in 10 s
        assert!((speed - 11.12).abs() < 0.1, "got {speed}");
    }

    #[test]
    fn test_speed_since_requires_increasing_time() {
        let t0 = Utc::now();
        let a = LocationSample::new(0.0, 0.0).at(t0);
        let b = LocationSample::new(0.001, 0.0).at(t0);
        assert!(b.speed_since(&a).is_none());
        assert!(a.speed_since(&b.clone().at(t0 + Duration::seconds(1))).is_none());
    }
}
