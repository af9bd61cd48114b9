//! Location permission states and transition tracking.

mod status;
mod tracker;

pub use status::{AuthorizationMode, AuthorizationStatus};
pub use tracker::{AuthorizationLevel, PermissionOutcome, PermissionTracker, UpdatePathAction};
