//! Pacekeeper - power-aware location updates
//!
//! Wraps a noisy, event-driven platform location source and turns its raw
//! fixes into a small set of typed events:
//!
//! - speed-adaptive interval updates, distance updates and a heartbeat
//! - first-fix acquisition with a bounded retry budget
//! - authorization transitions reduced to level and user notifications
//! - suspend/resume on application background/foreground transitions
//!
//! The core is [`LocationManager`], a synchronous state machine. Drive it
//! directly, from a tokio task with [`runtime::SessionDriver`], or
//! deterministically with [`runtime::Replay`].

pub mod authorization;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod first_fix;
pub mod location;
pub mod logging;
pub mod manager;
pub mod monitor;
pub mod runtime;
pub mod source;
pub mod throttle;
pub mod timer;

pub use authorization::{AuthorizationMode, AuthorizationStatus};
pub use error::{ConfigError, DriverError, ManagerError};
pub use events::{EventHub, LocationError, LocationEvent, Notification};
pub use location::LocationSample;
pub use manager::{LocationManager, ManagerConfig, SessionState};
