//! Timer registry keyed by purpose.
//!
//! Each purpose owns exactly one slot, so "at most one active timer per
//! purpose" holds by construction: arming an occupied slot is refused.
//! Timers do not run on their own. The owner asks for [`TimerRegistry::next_deadline`]
//! and pumps expiries with [`TimerRegistry::pop_due`].
//!
//! ```text
//!            arm()                pop_due() (one-shot)
//!   Empty ----------> Armed ---------------------------> Empty
//!     ^                 |  \
//!     |     cancel()    |   \ pop_due() (repeating)
//!     +-----------------+    +---> Armed (deadline += period)
//! ```
//!
//! Once [`TimerRegistry::seal`] is called every slot is cleared and no timer
//! can be armed again.

use std::time::{Duration, Instant};

/// Purpose of a timer owned by the location manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Repeating first-fix poll.
    FirstFix,
    /// One-shot interval gate.
    Throttle,
    /// Repeating heartbeat re-emitting the latest sample.
    Loop,
}

impl TimerKind {
    /// All timer purposes.
    pub const ALL: [TimerKind; 3] = [TimerKind::FirstFix, TimerKind::Throttle, TimerKind::Loop];

    fn slot(self) -> usize {
        match self {
            TimerKind::FirstFix => 0,
            TimerKind::Throttle => 1,
            TimerKind::Loop => 2,
        }
    }
}

impl std::fmt::Display for TimerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimerKind::FirstFix => write!(f, "first-fix"),
            TimerKind::Throttle => write!(f, "throttle"),
            TimerKind::Loop => write!(f, "loop"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct TimerEntry {
    deadline: Instant,
    /// `Some` for repeating timers.
    period: Option<Duration>,
}

/// Registry of the manager's timers, one slot per [`TimerKind`].
#[derive(Debug, Default)]
pub struct TimerRegistry {
    slots: [Option<TimerEntry>; 3],
    sealed: bool,
}

impl TimerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a one-shot timer firing `delay` after `now`.
    ///
    /// Returns `false` if the slot is already armed or the registry is sealed.
    pub fn arm_once(&mut self, kind: TimerKind, now: Instant, delay: Duration) -> bool {
        self.arm(kind, now, delay, None)
    }

    /// Arm a repeating timer firing every `period`, first after one period.
    ///
    /// Returns `false` if the slot is already armed or the registry is sealed.
    pub fn arm_repeating(&mut self, kind: TimerKind, now: Instant, period: Duration) -> bool {
        self.arm(kind, now, period, Some(period))
    }

    fn arm(
        &mut self,
        kind: TimerKind,
        now: Instant,
        delay: Duration,
        period: Option<Duration>,
    ) -> bool {
        if self.sealed {
            tracing::debug!(timer = %kind, "Timer registry sealed, refusing to arm");
            return false;
        }
        let slot = &mut self.slots[kind.slot()];
        if slot.is_some() {
            tracing::trace!(timer = %kind, "Timer already armed");
            return false;
        }
        let Some(deadline) = now.checked_add(delay) else {
            tracing::warn!(timer = %kind, delay_secs = delay.as_secs(), "Timer delay out of range, not arming");
            return false;
        };
        *slot = Some(TimerEntry { deadline, period });
        tracing::trace!(timer = %kind, delay_ms = delay.as_millis() as u64, "Timer armed");
        true
    }

    /// Cancel a timer. Returns `true` if it was armed.
    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        let was_armed = self.slots[kind.slot()].take().is_some();
        if was_armed {
            tracing::trace!(timer = %kind, "Timer cancelled");
        }
        was_armed
    }

    /// Cancel every timer.
    pub fn cancel_all(&mut self) {
        for kind in TimerKind::ALL {
            self.cancel(kind);
        }
    }

    /// Cancel everything and refuse all future arming.
    pub fn seal(&mut self) {
        self.cancel_all();
        self.sealed = true;
    }

    /// Whether [`seal`](Self::seal) has been called.
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Whether a timer of this kind is armed.
    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.slots[kind.slot()].is_some()
    }

    /// Number of armed timers.
    pub fn armed_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Deadline of a specific timer.
    pub fn deadline(&self, kind: TimerKind) -> Option<Instant> {
        self.slots[kind.slot()].map(|e| e.deadline)
    }

    /// Earliest deadline across all armed timers.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.slots.iter().flatten().map(|e| e.deadline).min()
    }

    /// Take the earliest timer whose deadline is at or before `now`.
    ///
    /// One-shot timers are removed. Repeating timers are rescheduled one
    /// period later; missed periods are skipped so the new deadline is
    /// always after `now`.
    pub fn pop_due(&mut self, now: Instant) -> Option<TimerKind> {
        let kind = TimerKind::ALL
            .into_iter()
            .filter_map(|k| self.slots[k.slot()].map(|e| (k, e.deadline)))
            .filter(|(_, deadline)| *deadline <= now)
            .min_by_key(|(_, deadline)| *deadline)
            .map(|(k, _)| k)?;

        let slot = &mut self.slots[kind.slot()];
        match slot.as_mut() {
            Some(entry) => match entry.period {
                Some(period) if !period.is_zero() => {
                    let next = entry
                        .deadline
                        .checked_add(period)
                        .filter(|next| *next > now)
                        .or_else(|| now.checked_add(period));
                    match next {
                        Some(next) => entry.deadline = next,
                        None => *slot = None,
                    }
                }
                _ => *slot = None,
            },
            None => return None,
        }
        Some(kind)
    }
}
