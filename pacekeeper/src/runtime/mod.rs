//! Drivers that serialise inputs onto a [`crate::LocationManager`].
//!
//! - [`SessionDriver`]: tokio task fed through a channel, sleeping until the
//!   next timer deadline.
//! - [`Replay`]: deterministic stepping over a [`crate::clock::ManualClock`].

mod driver;
mod input;
mod replay;

pub use driver::{SessionDriver, SessionHandle, DEFAULT_INPUT_CHANNEL_CAPACITY};
pub use input::SessionInput;
pub use replay::Replay;
