//! Distance gate.
//!
//! Accumulates great-circle distance between consecutive samples and fires
//! once the total exceeds the threshold. With scaling enabled the threshold
//! grows with speed as `max(0.3 * v^2 + base, base)`, so fast movement
//! reports less often per metre.

use crate::location::LocationSample;

/// Default base threshold in meters.
pub const DEFAULT_MINIMUM_UPDATE_DISTANCE: f64 = 50.0;

const SCALING_FACTOR: f64 = 0.3;

#[derive(Debug)]
pub struct DistanceGate {
    base: f64,
    scaling: bool,
    accumulated: f64,
    previous: Option<LocationSample>,
}

impl DistanceGate {
    pub fn new(base: f64, scaling: bool) -> Self {
        Self {
            base: base.max(0.0),
            scaling,
            accumulated: 0.0,
            previous: None,
        }
    }

    /// Distance accumulated since the last firing, in meters.
    pub fn accumulated(&self) -> f64 {
        self.accumulated
    }

    /// Threshold for a sample moving at `speed` m/s.
    pub fn threshold(&self, speed: Option<f64>) -> f64 {
        match (self.scaling, speed) {
            (true, Some(v)) => (SCALING_FACTOR * v * v + self.base).max(self.base),
            _ => self.base,
        }
    }

    /// Feed a sample. Returns the accumulated distance when the gate fires.
    ///
    /// With `suppress` set the sample only becomes the new reference point.
    pub fn observe(&mut self, sample: &LocationSample, suppress: bool) -> Option<f64> {
        let previous = self.previous.replace(sample.clone());
        let previous = previous?;

        if suppress {
            tracing::trace!("Distance accumulation suppressed while stationary");
            return None;
        }

        self.accumulated += previous.distance_to(sample);

        let speed = sample.speed.or_else(|| sample.speed_since(&previous));
        let threshold = self.threshold(speed);
        if self.accumulated > threshold {
            let distance = self.accumulated;
            self.accumulated = 0.0;
            return Some(distance);
        }
        None
    }

    /// Forget the reference point and the accumulator.
    pub fn reset(&mut self) {
        self.accumulated = 0.0;
        self.previous = None;
    }
}

impl Default for DistanceGate {
    fn default() -> Self {
        Self::new(DEFAULT_MINIMUM_UPDATE_DISTANCE, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};

    // Roughly 11.1 m per 0.0001 degree of latitude
    fn north_of(base: &LocationSample, meters: f64) -> LocationSample {
        LocationSample::new(base.latitude() + meters / 111_195.0, base.longitude())
    }

    #[test]
    fn test_first_sample_sets_reference() {
        let mut gate = DistanceGate::default();
        assert_eq!(gate.observe(&LocationSample::new(0.0, 0.0), false), None);
        assert_eq!(gate.accumulated(), 0.0);
    }

    #[test]
    fn test_fires_after_threshold() {
        let mut gate = DistanceGate::default();
        let a = LocationSample::new(0.0, 0.0);
        let b = north_of(&a, 30.0);
        let c = north_of(&b, 30.0);

        assert_eq!(gate.observe(&a, false), None);
        assert_eq!(gate.observe(&b, false), None);
        let fired = gate.observe(&c, false).unwrap();
        assert!((fired - 60.0).abs() < 0.5, "fired at {fired}");
        assert_eq!(gate.accumulated(), 0.0);
    }

    #[test]
    fn test_suppressed_does_not_accumulate() {
        let mut gate = DistanceGate::default();
        let a = LocationSample::new(0.0, 0.0);
        let b = north_of(&a, 100.0);
        gate.observe(&a, false);
        assert_eq!(gate.observe(&b, true), None);
        assert_eq!(gate.accumulated(), 0.0);
    }

    #[test]
    fn test_scaled_threshold() {
        let gate = DistanceGate::new(50.0, true);
        assert_eq!(gate.threshold(None), 50.0);
        assert_eq!(gate.threshold(Some(0.0)), 50.0);
        assert!((gate.threshold(Some(10.0)) - 80.0).abs() < 1e-9);

        let flat = DistanceGate::new(50.0, false);
        assert_eq!(flat.threshold(Some(10.0)), 50.0);
    }

    #[test]
    fn test_scaling_estimates_speed_from_previous() {
        let mut gate = DistanceGate::new(50.0, true);
        let t0 = Utc::now();
        let a = LocationSample::new(0.0, 0.0).at(t0);
        // 60 m in 2 s: 30 m/s, threshold 320 m
        let b = north_of(&a, 60.0).at(t0 + ChronoDuration::seconds(2));

        gate.observe(&a, false);
        assert_eq!(gate.observe(&b, false), None);
        assert!(gate.accumulated() > 59.0);
    }

    #[test]
    fn test_reset_forgets_reference() {
        let mut gate = DistanceGate::default();
        let a = LocationSample::new(0.0, 0.0);
        gate.observe(&a, false);
        gate.observe(&north_of(&a, 20.0), false);
        gate.reset();

        assert_eq!(gate.accumulated(), 0.0);
        assert_eq!(gate.observe(&north_of(&a, 500.0), false), None);
    }
}
