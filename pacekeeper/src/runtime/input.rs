//! Inputs a driver can deliver to the manager.

use crate::authorization::{AuthorizationMode, AuthorizationStatus};
use crate::location::LocationSample;
use crate::manager::LocationManager;
use crate::source::LocationSource;
use crate::throttle::MotionActivity;

/// A platform callback or application command.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionInput {
    // Platform callbacks
    Location(LocationSample),
    ExternalLocation(LocationSample),
    AuthorizationChanged(AuthorizationStatus),
    Activity(MotionActivity),
    WillResignActive,
    DidBecomeActive,

    // Application commands
    RequestAuthorization(AuthorizationMode),
    Start,
    StartWithRequest(AuthorizationMode),
    Stop,
    OneTimeUpdate,
    RestartFirstFix,
    SetAllowBackgroundUpdates(bool),
    UnregisterObserver,
    Destroy,
}

impl SessionInput {
    /// Deliver to `manager`.
    pub fn apply<S: LocationSource>(self, manager: &mut LocationManager<S>) {
        match self {
            SessionInput::Location(sample) => manager.on_location(sample),
            SessionInput::ExternalLocation(sample) => manager.on_external_location(sample),
            SessionInput::AuthorizationChanged(status) => manager.on_authorization_changed(status),
            SessionInput::Activity(activity) => manager.on_activity(activity),
            SessionInput::WillResignActive => manager.on_app_will_resign_active(),
            SessionInput::DidBecomeActive => manager.on_app_did_become_active(),
            SessionInput::RequestAuthorization(mode) => manager.request_authorization(mode),
            SessionInput::Start => manager.start(),
            SessionInput::StartWithRequest(mode) => manager.start_with_request(mode),
            SessionInput::Stop => manager.stop(),
            SessionInput::OneTimeUpdate => manager.request_one_time_update(),
            SessionInput::RestartFirstFix => manager.restart_first_fix(),
            SessionInput::SetAllowBackgroundUpdates(allow) => {
                manager.set_allow_background_updates(allow)
            }
            SessionInput::UnregisterObserver => {
                manager.unregister_external_observer();
            }
            SessionInput::Destroy => manager.destroy(),
        }
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            SessionInput::Location(_) => "location",
            SessionInput::ExternalLocation(_) => "external_location",
            SessionInput::AuthorizationChanged(_) => "authorization_changed",
            SessionInput::Activity(_) => "activity",
            SessionInput::WillResignActive => "will_resign_active",
            SessionInput::DidBecomeActive => "did_become_active",
            SessionInput::RequestAuthorization(_) => "request_authorization",
            SessionInput::Start => "start",
            SessionInput::StartWithRequest(_) => "start_with_request",
            SessionInput::Stop => "stop",
            SessionInput::OneTimeUpdate => "one_time_update",
            SessionInput::RestartFirstFix => "restart_first_fix",
            SessionInput::SetAllowBackgroundUpdates(_) => "set_allow_background_updates",
            SessionInput::UnregisterObserver => "unregister_observer",
            SessionInput::Destroy => "destroy",
        }
    }
}
