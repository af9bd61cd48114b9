//! Debounced time gate.
//!
//! A sample is admitted when no throttle timer is pending. Admission arms
//! the timer for the selected interval; its expiry simply clears the slot so
//! the next sample after it is admitted straight away. A deadline at or
//! before the sample's instant counts as expired even if nobody has popped
//! it yet.

use std::time::{Duration, Instant};

use crate::timer::{TimerKind, TimerRegistry};

#[derive(Debug, Default)]
pub struct IntervalGate {
    last_emitted: Option<Instant>,
}

impl IntervalGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// When the last interval update went out.
    pub fn last_emitted(&self) -> Option<Instant> {
        self.last_emitted
    }

    /// Try to admit a sample. On success the throttle timer is armed for
    /// `interval`.
    pub fn admit(&mut self, interval: Duration, timers: &mut TimerRegistry, now: Instant) -> bool {
        match timers.deadline(TimerKind::Throttle) {
            Some(deadline) if deadline > now => {
                tracing::trace!("Interval gate closed");
                return false;
            }
            // Expired but not yet pumped
            Some(_) => {
                timers.cancel(TimerKind::Throttle);
            }
            None => {}
        }
        if !timers.arm_once(TimerKind::Throttle, now, interval) {
            return false;
        }
        self.last_emitted = Some(now);
        true
    }

    /// Admit unconditionally and re-arm the timer for `interval`.
    ///
    /// Returns the time elapsed since the previous interval update, or zero
    /// if there was none.
    pub fn force(&mut self, interval: Duration, timers: &mut TimerRegistry, now: Instant) -> Duration {
        let elapsed = self
            .last_emitted
            .map(|last| now.saturating_duration_since(last))
            .unwrap_or(Duration::ZERO);
        timers.cancel(TimerKind::Throttle);
        timers.arm_once(TimerKind::Throttle, now, interval);
        self.last_emitted = Some(now);
        elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIVE: Duration = Duration::from_secs(5);

    #[test]
    fn test_first_sample_admitted() {
        let mut gate = IntervalGate::new();
        let mut timers = TimerRegistry::new();
        let now = Instant::now();

        assert!(gate.admit(FIVE, &mut timers, now));
        assert_eq!(timers.deadline(TimerKind::Throttle), Some(now + FIVE));
        assert_eq!(gate.last_emitted(), Some(now));
    }

    #[test]
    fn test_closed_until_expiry() {
        let mut gate = IntervalGate::new();
        let mut timers = TimerRegistry::new();
        let start = Instant::now();

        assert!(gate.admit(FIVE, &mut timers, start));
        assert!(!gate.admit(FIVE, &mut timers, start + Duration::from_secs(3)));

        assert_eq!(timers.pop_due(start + FIVE), Some(TimerKind::Throttle));
        assert!(gate.admit(FIVE, &mut timers, start + Duration::from_secs(6)));
    }

    #[test]
    fn test_expired_deadline_opens_gate_before_pop() {
        let mut gate = IntervalGate::new();
        let mut timers = TimerRegistry::new();
        let start = Instant::now();

        assert!(gate.admit(FIVE, &mut timers, start));
        assert!(!gate.admit(FIVE, &mut timers, start + Duration::from_secs(4)));

        let later = start + Duration::from_secs(6);
        assert!(gate.admit(FIVE, &mut timers, later));
        assert_eq!(timers.deadline(TimerKind::Throttle), Some(later + FIVE));
    }

    #[test]
    fn test_force_reports_elapsed() {
        let mut gate = IntervalGate::new();
        let mut timers = TimerRegistry::new();
        let start = Instant::now();

        assert_eq!(gate.force(FIVE, &mut timers, start), Duration::ZERO);

        let later = start + Duration::from_secs(2);
        assert_eq!(gate.force(FIVE, &mut timers, later), Duration::from_secs(2));
        assert_eq!(timers.deadline(TimerKind::Throttle), Some(later + FIVE));
    }
}
