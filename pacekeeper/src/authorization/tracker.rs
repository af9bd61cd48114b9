//! Permission state tracker.
//!
//! A pure reducer over the raw authorization status stream. It derives two
//! independent notification classes:
//!
//! - **Level** notifications (`AuthorizationAllowed`, `AuthorizationDenied`)
//!   fire once per contiguous stay in a level.
//! - **User** notifications (`UserAllowedAuthorization`, `UserDeniedAuthorization`)
//!   fire only when the change follows a `NotDetermined` status or happens
//!   while the application is backgrounded, i.e. when a person made the call.
//!
//! ```text
//!              Authorized*                 Denied
//!   Unknown -------------> Allowed <-------------------> Denied
//!      |                                 Authorized*        ^
//!      +----------------------------------------------------+
//!                              Denied
//! ```

use super::status::AuthorizationStatus;
use crate::events::Notification;

/// Permission level the tracker is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthorizationLevel {
    /// No authorized/denied status has been seen yet.
    #[default]
    Unknown,
    Allowed,
    Denied,
}

/// What the owner should do with the update path after a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePathAction {
    /// (Re-)start location updates and background monitoring.
    Start,
    /// Stop location updates.
    Stop,
    /// Leave the update path alone.
    None,
}

/// Result of feeding one status into the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionOutcome {
    /// Notifications to raise, in order.
    pub notifications: Vec<Notification>,
    pub action: UpdatePathAction,
}

impl PermissionOutcome {
    fn none() -> Self {
        Self {
            notifications: Vec::new(),
            action: UpdatePathAction::None,
        }
    }
}

/// Tracks authorization level transitions.
#[derive(Debug, Default)]
pub struct PermissionTracker {
    level: AuthorizationLevel,
    /// Sticky once a `NotDetermined` status was observed.
    not_determined_seen: bool,
}

impl PermissionTracker {
    /// Create a tracker with no observed status.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current permission level.
    pub fn level(&self) -> AuthorizationLevel {
        self.level
    }

    /// Whether a `NotDetermined` status was ever observed.
    pub fn not_determined_seen(&self) -> bool {
        self.not_determined_seen
    }

    /// Reduce a raw status change.
    ///
    /// `backgrounded` reports whether the application is currently in the
    /// background, which marks the change as user-driven.
    pub fn on_status(
        &mut self,
        status: AuthorizationStatus,
        backgrounded: bool,
    ) -> PermissionOutcome {
        let user_driven = self.not_determined_seen || backgrounded;

        match status {
            AuthorizationStatus::AuthorizedAlways | AuthorizationStatus::AuthorizedWhenInUse => {
                let mut notifications = Vec::new();
                if user_driven {
                    notifications.push(Notification::UserAllowedAuthorization);
                }
                if self.level != AuthorizationLevel::Allowed {
                    tracing::info!(%status, from = ?self.level, "Authorization level: allowed");
                    self.level = AuthorizationLevel::Allowed;
                    notifications.push(Notification::AuthorizationAllowed);
                }
                PermissionOutcome {
                    notifications,
                    action: UpdatePathAction::Start,
                }
            }
            AuthorizationStatus::NotDetermined => {
                tracing::debug!("Authorization not determined yet");
                self.not_determined_seen = true;
                PermissionOutcome::none()
            }
            AuthorizationStatus::Denied => {
                let mut notifications = Vec::new();
                if user_driven {
                    notifications.push(Notification::UserDeniedAuthorization);
                }
                if self.level != AuthorizationLevel::Denied {
                    tracing::info!(from = ?self.level, "Authorization level: denied");
                    self.level = AuthorizationLevel::Denied;
                    notifications.push(Notification::AuthorizationDenied);
                }
                PermissionOutcome {
                    notifications,
                    action: UpdatePathAction::Stop,
                }
            }
            AuthorizationStatus::Restricted => {
                tracing::debug!("Authorization restricted, ignoring");
                PermissionOutcome::none()
            }
        }
    }
}
