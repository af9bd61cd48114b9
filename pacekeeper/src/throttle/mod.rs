//! Throttling of raw fixes into interval, distance and loop updates.
//!
//! The controller owns no timers itself; it arms and cancels slots in the
//! caller's [`TimerRegistry`] so the session keeps a single place where
//! timers live.

mod distance;
mod interval;
mod motion;
mod policy;

pub use distance::{DistanceGate, DEFAULT_MINIMUM_UPDATE_DISTANCE};
pub use interval::IntervalGate;
pub use motion::MotionActivity;
pub use policy::{
    TimeIntervalPolicy, DEFAULT_MAX_INTERVAL, DEFAULT_MIN_INTERVAL, DEFAULT_SPEED_THRESHOLD,
};

use std::time::{Duration, Instant};

use crate::location::LocationSample;
use crate::timer::{TimerKind, TimerRegistry};

/// Default heartbeat period.
pub const DEFAULT_LOOP_INTERVAL: Duration = Duration::from_secs(5);

/// Gate outcome for one sample.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ThrottleDecision {
    /// Set when the interval gate admitted the sample.
    pub interval: Option<Duration>,
    /// Set when the distance gate fired.
    pub distance_m: Option<f64>,
}

/// Throttle settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThrottleConfig {
    pub policy: TimeIntervalPolicy,
    pub loop_interval: Duration,
    pub minimum_update_distance: f64,
    pub distance_scaling: bool,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            policy: TimeIntervalPolicy::default(),
            loop_interval: DEFAULT_LOOP_INTERVAL,
            minimum_update_distance: DEFAULT_MINIMUM_UPDATE_DISTANCE,
            distance_scaling: false,
        }
    }
}

#[derive(Debug)]
pub struct ThrottleController {
    policy: TimeIntervalPolicy,
    loop_interval: Duration,
    interval: IntervalGate,
    distance: DistanceGate,
    activity: MotionActivity,
    /// Whether motion classification drives distance suppression.
    activity_available: bool,
}

impl ThrottleController {
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            policy: config.policy,
            loop_interval: config.loop_interval,
            interval: IntervalGate::new(),
            distance: DistanceGate::new(config.minimum_update_distance, config.distance_scaling),
            activity: MotionActivity::Unknown,
            activity_available: false,
        }
    }

    pub fn policy(&self) -> &TimeIntervalPolicy {
        &self.policy
    }

    pub fn loop_interval(&self) -> Duration {
        self.loop_interval
    }

    pub fn activity(&self) -> MotionActivity {
        self.activity
    }

    pub fn set_activity_available(&mut self, available: bool) {
        self.activity_available = available;
    }

    pub fn set_activity(&mut self, activity: MotionActivity) {
        if activity != self.activity {
            tracing::debug!(from = %self.activity, to = %activity, "Motion activity changed");
        }
        self.activity = activity;
    }

    /// Run a sample through both gates.
    pub fn on_sample(
        &mut self,
        sample: &LocationSample,
        timers: &mut TimerRegistry,
        now: Instant,
    ) -> ThrottleDecision {
        let interval = self.policy.select(sample.speed);
        let admitted = self.interval.admit(interval, timers, now);

        let suppress = self.activity_available && self.activity.suppresses_distance();
        let distance_m = self.distance.observe(sample, suppress);

        ThrottleDecision {
            interval: admitted.then_some(interval),
            distance_m,
        }
    }

    /// Bypass the interval gate.
    ///
    /// Returns the time since the previous interval update. The sample still
    /// feeds the distance gate's reference point.
    pub fn force(
        &mut self,
        sample: &LocationSample,
        timers: &mut TimerRegistry,
        now: Instant,
    ) -> Duration {
        let interval = self.policy.select(sample.speed);
        self.distance.observe(sample, true);
        self.interval.force(interval, timers, now)
    }

    /// Arm the heartbeat. Returns `false` if it was already running.
    pub fn arm_loop(&self, timers: &mut TimerRegistry, now: Instant) -> bool {
        timers.arm_repeating(TimerKind::Loop, now, self.loop_interval)
    }

    /// Cancel throttle and loop timers and forget the distance reference.
    pub fn halt(&mut self, timers: &mut TimerRegistry) {
        timers.cancel(TimerKind::Throttle);
        timers.cancel(TimerKind::Loop);
        self.distance.reset();
    }
}

impl Default for ThrottleController {
    fn default() -> Self {
        Self::new(ThrottleConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moving(lat: f64) -> LocationSample {
        LocationSample::new(lat, 10.0).with_speed(2.0)
    }

    #[test]
    fn test_fast_samples_gate_at_min_interval() {
        let mut throttle = ThrottleController::default();
        let mut timers = TimerRegistry::new();
        let start = Instant::now();

        let first = throttle.on_sample(&moving(53.0), &mut timers, start);
        assert_eq!(first.interval, Some(Duration::from_secs(5)));

        let second = throttle.on_sample(&moving(53.0), &mut timers, start + Duration::from_secs(4));
        assert_eq!(second.interval, None);

        assert_eq!(
            timers.pop_due(start + Duration::from_secs(5)),
            Some(TimerKind::Throttle)
        );
        let third = throttle.on_sample(&moving(53.0), &mut timers, start + Duration::from_secs(5));
        assert_eq!(third.interval, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_stationary_gates_at_max_interval() {
        let mut throttle = ThrottleController::default();
        let mut timers = TimerRegistry::new();
        let start = Instant::now();

        let sample = LocationSample::new(53.0, 10.0).with_speed(0.0);
        let decision = throttle.on_sample(&sample, &mut timers, start);
        assert_eq!(decision.interval, Some(Duration::from_secs(300)));
        assert_eq!(
            timers.deadline(TimerKind::Throttle),
            Some(start + Duration::from_secs(300))
        );
    }

    #[test]
    fn test_stationary_activity_suppresses_distance_only_when_available() {
        let mut throttle = ThrottleController::default();
        let mut timers = TimerRegistry::new();
        let now = Instant::now();
        throttle.set_activity(MotionActivity::Stationary);

        throttle.on_sample(&moving(53.0), &mut timers, now);
        let decision = throttle.on_sample(&moving(53.001), &mut timers, now);
        assert!(decision.distance_m.is_some());

        throttle.set_activity_available(true);
        let decision = throttle.on_sample(&moving(53.002), &mut timers, now);
        assert_eq!(decision.distance_m, None);
    }

    #[test]
    fn test_halt_cancels_timers() {
        let mut throttle = ThrottleController::default();
        let mut timers = TimerRegistry::new();
        let now = Instant::now();

        assert!(throttle.arm_loop(&mut timers, now));
        assert!(!throttle.arm_loop(&mut timers, now));
        throttle.on_sample(&moving(53.0), &mut timers, now);
        assert_eq!(timers.armed_count(), 2);

        throttle.halt(&mut timers);
        assert_eq!(timers.armed_count(), 0);
    }

    #[test]
    fn test_force_rearms_throttle() {
        let mut throttle = ThrottleController::default();
        let mut timers = TimerRegistry::new();
        let start = Instant::now();

        throttle.on_sample(&moving(53.0), &mut timers, start);
        let elapsed = throttle.force(&moving(53.0), &mut timers, start + Duration::from_secs(2));
        assert_eq!(elapsed, Duration::from_secs(2));
        assert_eq!(
            timers.deadline(TimerKind::Throttle),
            Some(start + Duration::from_secs(7))
        );
    }
}
