//! Monotonic time sources for the update policy.
//!
//! The manager never calls `Instant::now()` directly. All timer deadlines and
//! throttle decisions are taken against a [`Clock`], so the same state machine
//! can run on wall time, on tokio's (possibly paused) time, or on a manually
//! advanced clock during replay and tests.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Source of monotonic time.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> Instant;
}

/// Clock backed by `std::time::Instant::now()`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock backed by `tokio::time::Instant::now()`.
///
/// Use this with [`crate::runtime::SessionDriver`] so that deadlines agree with
/// `tokio::time::sleep_until`, including under `start_paused` test runtimes.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }
}

/// Manually advanced clock for deterministic replay.
///
/// Cloning shares the underlying time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    /// Create a clock frozen at the current instant.
    pub fn new() -> Self {
        let origin = Instant::now();
        Self {
            origin,
            now: Arc::new(Mutex::new(origin)),
        }
    }

    /// Move the clock forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        let mut now = self.now.lock();
        *now += delta;
    }

    /// Set the clock to `instant`. Moving backwards is ignored.
    pub fn set(&self, instant: Instant) {
        let mut now = self.now.lock();
        if instant > *now {
            *now = instant;
        }
    }

    /// Time elapsed since the clock was created.
    pub fn elapsed(&self) -> Duration {
        self.now.lock().duration_since(self.origin)
    }

    /// The instant the clock was created at.
    pub fn origin(&self) -> Instant {
        self.origin
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_starts_at_origin() {
        let clock = ManualClock::new();
        assert_eq!(clock.now(), clock.origin());
        assert_eq!(clock.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_manual_clock_advance_is_shared() {
        let clock = ManualClock::new();
        let shared = clock.clone();

        clock.advance(Duration::from_secs(3));
        assert_eq!(shared.elapsed(), Duration::from_secs(3));
    }

    #[test]
    fn test_manual_clock_ignores_backwards_set() {
        let clock = ManualClock::new();
        clock.advance(Duration::from_secs(10));

        clock.set(clock.origin() + Duration::from_secs(2));
        assert_eq!(clock.elapsed(), Duration::from_secs(10));

        clock.set(clock.origin() + Duration::from_secs(12));
        assert_eq!(clock.elapsed(), Duration::from_secs(12));
    }
}
