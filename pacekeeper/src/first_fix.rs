//! First-fix acquisition with a bounded retry budget.
//!
//! GPS fixes can take several seconds to arrive. Rather than relying on
//! sensor-specific timeouts, the controller polls for a current sample at a
//! fixed period and gives up after a configured number of attempts.
//!
//! # State Machine
//!
//! ```text
//!          begin()             poll() with sample
//!   Idle ----------> Polling ---------------------> Acquired
//!    ^                  |
//!    |     suspend()    |  poll() without sample, attempts == budget
//!    +------------------+-----------------------------------------> Exhausted
//!
//!   reset(): any -> Idle (attempts = 0)
//! ```
//!
//! `Acquired` and `Exhausted` are sticky until [`FirstFixController::reset`].

use std::time::{Duration, Instant};

use crate::location::LocationSample;
use crate::timer::{TimerKind, TimerRegistry};

/// Default number of polls before giving up.
pub const DEFAULT_FIRST_FIX_ATTEMPTS: u32 = 5;

/// Default period between polls.
pub const DEFAULT_FIRST_FIX_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Acquisition state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FirstFixState {
    #[default]
    Idle,
    Polling,
    Acquired,
    Exhausted,
}

/// Result of a single poll.
#[derive(Debug, Clone, PartialEq)]
pub enum FirstFixPoll {
    /// A sample was available; acquisition is complete.
    Acquired(LocationSample),
    /// No sample yet; `attempt` polls have failed so far.
    Pending { attempt: u32 },
    /// The budget ran out on this poll.
    Exhausted,
    /// The controller is not polling.
    Inactive,
}

/// Bounded-retry first-fix poller.
#[derive(Debug)]
pub struct FirstFixController {
    state: FirstFixState,
    attempts: u32,
    budget: u32,
    poll_interval: Duration,
}

impl FirstFixController {
    /// Create a controller giving up after `budget` failed polls.
    pub fn new(budget: u32, poll_interval: Duration) -> Self {
        Self {
            state: FirstFixState::Idle,
            attempts: 0,
            budget: budget.max(1),
            poll_interval,
        }
    }

    pub fn state(&self) -> FirstFixState {
        self.state
    }

    /// Failed polls so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_acquired(&self) -> bool {
        self.state == FirstFixState::Acquired
    }

    /// Enter polling and arm the poll timer.
    ///
    /// Returns `true` when polling started, in which case the caller should
    /// poll once immediately. Does nothing once acquired or exhausted.
    pub fn begin(&mut self, timers: &mut TimerRegistry, now: Instant) -> bool {
        if self.state != FirstFixState::Idle {
            return false;
        }
        if !timers.arm_repeating(TimerKind::FirstFix, now, self.poll_interval) {
            return false;
        }
        tracing::debug!(
            attempts = self.attempts,
            budget = self.budget,
            "First-fix polling started"
        );
        self.state = FirstFixState::Polling;
        true
    }

    /// Poll for a current sample.
    pub fn poll(
        &mut self,
        current: Option<&LocationSample>,
        timers: &mut TimerRegistry,
    ) -> FirstFixPoll {
        if self.state != FirstFixState::Polling {
            return FirstFixPoll::Inactive;
        }

        if let Some(sample) = current {
            self.state = FirstFixState::Acquired;
            timers.cancel(TimerKind::FirstFix);
            return FirstFixPoll::Acquired(sample.clone());
        }

        self.attempts += 1;
        if self.attempts >= self.budget {
            tracing::warn!(attempts = self.attempts, "First-fix budget exhausted");
            self.state = FirstFixState::Exhausted;
            timers.cancel(TimerKind::FirstFix);
            return FirstFixPoll::Exhausted;
        }

        tracing::trace!(attempt = self.attempts, budget = self.budget, "No first fix yet");
        FirstFixPoll::Pending {
            attempt: self.attempts,
        }
    }

    /// Stop polling but keep the attempt count.
    pub fn suspend(&mut self, timers: &mut TimerRegistry) {
        timers.cancel(TimerKind::FirstFix);
        if self.state == FirstFixState::Polling {
            self.state = FirstFixState::Idle;
        }
    }

    /// Cancel polling and forget all progress.
    pub fn reset(&mut self, timers: &mut TimerRegistry) {
        timers.cancel(TimerKind::FirstFix);
        self.state = FirstFixState::Idle;
        self.attempts = 0;
    }
}

impl Default for FirstFixController {
    fn default() -> Self {
        Self::new(DEFAULT_FIRST_FIX_ATTEMPTS, DEFAULT_FIRST_FIX_POLL_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started() -> (FirstFixController, TimerRegistry, Instant) {
        let now = Instant::now();
        let mut timers = TimerRegistry::new();
        let mut controller = FirstFixController::default();
        assert!(controller.begin(&mut timers, now));
        (controller, timers, now)
    }

    #[test]
    fn test_begin_arms_timer() {
        let (controller, timers, now) = started();
        assert_eq!(controller.state(), FirstFixState::Polling);
        assert_eq!(
            timers.deadline(TimerKind::FirstFix),
            Some(now + Duration::from_secs(1))
        );
    }

    #[test]
    fn test_begin_twice_is_noop() {
        let (mut controller, mut timers, now) = started();
        assert!(!controller.begin(&mut timers, now));
        assert_eq!(timers.armed_count(), 1);
    }

    #[test]
    fn test_acquired_on_sample() {
        let (mut controller, mut timers, _) = started();
        let sample = LocationSample::new(53.5, 10.0);

        let result = controller.poll(Some(&sample), &mut timers);
        assert_eq!(result, FirstFixPoll::Acquired(sample));
        assert!(controller.is_acquired());
        assert!(!timers.is_armed(TimerKind::FirstFix));

        // Acquired is sticky
        assert_eq!(controller.poll(None, &mut timers), FirstFixPoll::Inactive);
    }

    #[test]
    fn test_exhausted_exactly_once_after_budget() {
        let (mut controller, mut timers, _) = started();

        for attempt in 1..5 {
            assert_eq!(
                controller.poll(None, &mut timers),
                FirstFixPoll::Pending { attempt }
            );
        }
        assert_eq!(controller.poll(None, &mut timers), FirstFixPoll::Exhausted);
        assert_eq!(controller.state(), FirstFixState::Exhausted);
        assert!(!timers.is_armed(TimerKind::FirstFix));

        // No further reports, and a late sample does not count
        let sample = LocationSample::new(53.5, 10.0);
        assert_eq!(
            controller.poll(Some(&sample), &mut timers),
            FirstFixPoll::Inactive
        );
    }

    #[test]
    fn test_exhausted_does_not_restart_without_reset() {
        let (mut controller, mut timers, now) = started();
        for _ in 0..5 {
            controller.poll(None, &mut timers);
        }
        assert!(!controller.begin(&mut timers, now));

        controller.reset(&mut timers);
        assert_eq!(controller.attempts(), 0);
        assert!(controller.begin(&mut timers, now));
    }

    #[test]
    fn test_suspend_keeps_attempts() {
        let (mut controller, mut timers, now) = started();
        controller.poll(None, &mut timers);
        controller.poll(None, &mut timers);

        controller.suspend(&mut timers);
        assert_eq!(controller.state(), FirstFixState::Idle);
        assert_eq!(controller.attempts(), 2);
        assert!(!timers.is_armed(TimerKind::FirstFix));

        assert!(controller.begin(&mut timers, now));
        for _ in 0..2 {
            controller.poll(None, &mut timers);
        }
        assert_eq!(controller.poll(None, &mut timers), FirstFixPoll::Exhausted);
    }

    #[test]
    fn test_reset_clears_acquired() {
        let (mut controller, mut timers, now) = started();
        controller.poll(Some(&LocationSample::new(1.0, 1.0)), &mut timers);
        assert!(controller.is_acquired());

        controller.reset(&mut timers);
        assert!(!controller.is_acquired());
        assert!(controller.begin(&mut timers, now));
    }

    #[test]
    fn test_begin_refused_by_sealed_registry() {
        let mut timers = TimerRegistry::new();
        timers.seal();
        let mut controller = FirstFixController::default();
        assert!(!controller.begin(&mut timers, Instant::now()));
        assert_eq!(controller.state(), FirstFixState::Idle);
    }
}
