//! Session lifecycle states.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a [`super::LocationManager`].
///
/// # State Machine
///
/// ```text
///   Idle --request_authorization--> AwaitingAuthorization
///   AwaitingAuthorization --granted, started--> Running
///   AwaitingAuthorization --granted, not started--> Idle
///   Idle/Paused --start (authorized)--> Running
///   Running --stop / pause--> Paused
///   Running --denied--> Paused            (start intent kept)
///   Paused --granted, start intent--> Running
///   Running --background, updates disallowed--> Backgrounded
///   Backgrounded --foreground--> Running
///   any --destroy--> Destroyed            (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    AwaitingAuthorization,
    Running,
    Paused,
    Backgrounded,
    Destroyed,
}

impl SessionState {
    /// Whether updates are being generated.
    pub fn is_running(&self) -> bool {
        matches!(self, SessionState::Running)
    }

    pub fn is_destroyed(&self) -> bool {
        matches!(self, SessionState::Destroyed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::AwaitingAuthorization => "awaiting_authorization",
            SessionState::Running => "running",
            SessionState::Paused => "paused",
            SessionState::Backgrounded => "backgrounded",
            SessionState::Destroyed => "destroyed",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
