//! Tokio session driver.
//!
//! The [`SessionDriver`] owns a [`LocationManager`] and is the only code that
//! touches it while running. Producers hold cloneable [`SessionHandle`]s.
//!
//! # Architecture
//!
//! ```text
//!  SessionHandle ──► mpsc ──► ┌──────────────────────────────┐
//!  SessionHandle ──►          │        SessionDriver         │
//!                             │                              │
//!                             │  select! (biased)            │
//!                             │    cancelled   ──► destroy   │
//!                             │    input       ──► apply     │
//!                             │    deadline    ──► fire      │
//!                             └──────────────┬───────────────┘
//!                                            ▼
//!                                        EventHub ──► subscribers
//! ```
//!
//! Build the manager on [`crate::clock::TokioClock`] so timer deadlines and
//! `sleep_until` agree, including under paused test time.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use pacekeeper::clock::TokioClock;
//! use pacekeeper::runtime::{SessionDriver, SessionInput};
//! use pacekeeper::source::SimulatedSource;
//! use pacekeeper::{LocationManager, ManagerConfig, SessionState};
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let manager = LocationManager::with_clock(
//!     SimulatedSource::authorized(),
//!     ManagerConfig::default(),
//!     Arc::new(TokioClock),
//! )
//! .unwrap();
//! let (driver, handle) = SessionDriver::new(manager);
//!
//! let shutdown = CancellationToken::new();
//! let task = tokio::spawn(driver.run(shutdown.clone()));
//!
//! handle.send(SessionInput::Start).await.unwrap();
//! shutdown.cancel();
//!
//! let manager = task.await.unwrap();
//! assert_eq!(manager.state(), SessionState::Destroyed);
//! # }
//! ```

use std::time::Instant;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use super::input::SessionInput;
use crate::error::DriverError;
use crate::events::EventHub;
use crate::manager::LocationManager;
use crate::source::LocationSource;

// =============================================================================
// Handle
// =============================================================================

/// Default capacity of the input channel.
pub const DEFAULT_INPUT_CHANNEL_CAPACITY: usize = 256;

/// Cloneable sender side of a running driver.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    input_tx: mpsc::Sender<SessionInput>,
    events: EventHub,
}

impl SessionHandle {
    /// Queue an input, waiting for channel space.
    pub async fn send(&self, input: SessionInput) -> Result<(), DriverError> {
        self.input_tx
            .send(input)
            .await
            .map_err(|_| DriverError::Stopped)
    }

    /// Queue an input without waiting. Fails if the channel is full or closed.
    pub fn try_send(&self, input: SessionInput) -> Result<(), DriverError> {
        self.input_tx
            .try_send(input)
            .map_err(|_| DriverError::Stopped)
    }

    /// The manager's event channels.
    pub fn events(&self) -> &EventHub {
        &self.events
    }

    /// Whether the driver has exited.
    pub fn is_closed(&self) -> bool {
        self.input_tx.is_closed()
    }
}

// =============================================================================
// Driver
// =============================================================================

/// Runs a manager on a tokio task.
pub struct SessionDriver<S: LocationSource> {
    manager: LocationManager<S>,
    input_rx: mpsc::Receiver<SessionInput>,
}

impl<S: LocationSource> SessionDriver<S> {
    /// Creates a driver with the default channel capacity.
    pub fn new(manager: LocationManager<S>) -> (Self, SessionHandle) {
        Self::with_capacity(manager, DEFAULT_INPUT_CHANNEL_CAPACITY)
    }

    /// Creates a driver whose input channel holds `capacity` inputs.
    pub fn with_capacity(manager: LocationManager<S>, capacity: usize) -> (Self, SessionHandle) {
        let (input_tx, input_rx) = mpsc::channel(capacity.max(1));
        let handle = SessionHandle {
            input_tx,
            events: manager.events().clone(),
        };
        (Self { manager, input_rx }, handle)
    }

    /// Runs until `shutdown` is cancelled, every handle is dropped, or the
    /// manager is destroyed by an input.
    ///
    /// The manager is destroyed on exit and handed back.
    pub async fn run(mut self, shutdown: CancellationToken) -> LocationManager<S> {
        info!("Session driver starting");

        loop {
            let deadline = self.manager.next_deadline();

            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Session driver shutting down");
                    break;
                }

                input = self.input_rx.recv() => match input {
                    Some(input) => {
                        trace!(input = input.name(), "Session input");
                        input.apply(&mut self.manager);
                    }
                    None => {
                        debug!("All session handles dropped");
                        break;
                    }
                },

                _ = sleep_until(deadline) => {
                    let fired = self.manager.fire_due_timers();
                    trace!(fired, "Timers fired");
                }
            }

            if self.manager.state().is_destroyed() {
                break;
            }
        }

        self.manager.destroy();
        info!("Session driver stopped");
        self.manager
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}
