//! Deterministic replay over a manual clock.
//!
//! Inputs are applied at offsets from the replay origin. Between inputs the
//! clock jumps from one timer deadline to the next, so timers fire in the
//! same order and at the same virtual instants every run.

use std::sync::Arc;
use std::time::{Duration, Instant};

use super::input::SessionInput;
use crate::clock::ManualClock;
use crate::error::ConfigError;
use crate::manager::{LocationManager, ManagerConfig};
use crate::source::{ActivitySource, LocationSource};

pub struct Replay<S: LocationSource> {
    manager: LocationManager<S>,
    clock: ManualClock,
}

impl<S: LocationSource> Replay<S> {
    /// Build a manager on a fresh manual clock.
    pub fn new(source: S, config: ManagerConfig) -> Result<Self, ConfigError> {
        let clock = ManualClock::new();
        let manager = LocationManager::with_clock(source, config, Arc::new(clock.clone()))?;
        Ok(Self { manager, clock })
    }

    /// Attach a motion activity source to the replayed manager.
    pub fn with_activity_source(mut self, activity: impl ActivitySource + 'static) -> Self {
        self.manager = self.manager.with_activity_source(activity);
        self
    }

    pub fn manager(&self) -> &LocationManager<S> {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut LocationManager<S> {
        &mut self.manager
    }

    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    /// Virtual time since the origin.
    pub fn elapsed(&self) -> Duration {
        self.clock.elapsed()
    }

    /// Fire the next batch of timers due at or before `offset`.
    ///
    /// Moves the clock to that batch's deadline. Returns `None` once nothing
    /// more is due, leaving the clock where it was.
    pub fn step_until(&mut self, offset: Duration) -> Option<usize> {
        let target = self.instant_at(offset)?;
        let deadline = self.manager.next_deadline().filter(|d| *d <= target)?;
        self.clock.set(deadline);
        let fired = self.manager.fire_due_timers();
        (fired > 0).then_some(fired)
    }

    /// Move to `offset` from the origin, firing every timer due on the way.
    ///
    /// Offsets in the past only fire timers that are already due. Offsets
    /// beyond the clock's range leave the replay untouched. Returns the
    /// number of timers fired.
    pub fn advance_to(&mut self, offset: Duration) -> usize {
        let Some(target) = self.instant_at(offset) else {
            tracing::warn!(offset_secs = offset.as_secs(), "Replay offset out of range");
            return 0;
        };
        let mut fired = 0;
        while let Some(count) = self.step_until(offset) {
            fired += count;
        }
        self.clock.set(target);
        fired
    }

    fn instant_at(&self, offset: Duration) -> Option<Instant> {
        self.clock.origin().checked_add(offset)
    }

    /// Move forward by `delta`.
    pub fn advance_by(&mut self, delta: Duration) -> usize {
        let offset = self.clock.elapsed().saturating_add(delta);
        self.advance_to(offset)
    }

    /// Advance to `offset`, then deliver `input`.
    pub fn apply_at(&mut self, offset: Duration, input: SessionInput) {
        self.advance_to(offset);
        tracing::trace!(
            offset_ms = offset.as_millis() as u64,
            input = input.name(),
            "Replaying input"
        );
        input.apply(&mut self.manager);
    }

    /// Finish the replay and take the manager.
    pub fn into_manager(self) -> LocationManager<S> {
        self.manager
    }
}
