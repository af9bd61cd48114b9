//! Collaborator interfaces the manager drives.
//!
//! Platform integrations implement these traits; the manager calls into
//! them and receives results back through its `on_*` input methods.

mod simulated;

pub use simulated::{
    ActivityProbe, ObserverProbe, SimulatedActivitySource, SimulatedObserver, SimulatedSource,
    SourceProbe,
};

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::authorization::{AuthorizationMode, AuthorizationStatus};
use crate::location::LocationSample;

/// Accuracy the platform sensor should aim for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DesiredAccuracy {
    #[default]
    Best,
    NearestTenMeters,
    HundredMeters,
    Kilometer,
    ThreeKilometers,
}

/// Hint about the kind of movement being tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Other,
    AutomotiveNavigation,
    #[default]
    Fitness,
    OtherNavigation,
}

impl DesiredAccuracy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DesiredAccuracy::Best => "best",
            DesiredAccuracy::NearestTenMeters => "nearest_ten_meters",
            DesiredAccuracy::HundredMeters => "hundred_meters",
            DesiredAccuracy::Kilometer => "kilometer",
            DesiredAccuracy::ThreeKilometers => "three_kilometers",
        }
    }
}

impl FromStr for DesiredAccuracy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "best" => Ok(DesiredAccuracy::Best),
            "nearest_ten_meters" => Ok(DesiredAccuracy::NearestTenMeters),
            "hundred_meters" => Ok(DesiredAccuracy::HundredMeters),
            "kilometer" => Ok(DesiredAccuracy::Kilometer),
            "three_kilometers" => Ok(DesiredAccuracy::ThreeKilometers),
            other => Err(format!("unknown accuracy '{}'", other)),
        }
    }
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Other => "other",
            ActivityType::AutomotiveNavigation => "automotive_navigation",
            ActivityType::Fitness => "fitness",
            ActivityType::OtherNavigation => "other_navigation",
        }
    }
}

impl FromStr for ActivityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "other" => Ok(ActivityType::Other),
            "automotive_navigation" => Ok(ActivityType::AutomotiveNavigation),
            "fitness" => Ok(ActivityType::Fitness),
            "other_navigation" => Ok(ActivityType::OtherNavigation),
            other => Err(format!("unknown activity type '{}'", other)),
        }
    }
}

/// Settings pushed to the location source once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorSettings {
    pub desired_accuracy: DesiredAccuracy,
    /// Minimum movement in meters before the sensor reports a new fix.
    pub distance_filter: f64,
    pub activity_type: ActivityType,
}

impl Default for SensorSettings {
    fn default() -> Self {
        Self {
            desired_accuracy: DesiredAccuracy::Best,
            distance_filter: 1.0,
            activity_type: ActivityType::Fitness,
        }
    }
}

/// Platform location sensor.
pub trait LocationSource: Send {
    fn configure(&mut self, settings: &SensorSettings);

    fn start_updates(&mut self);

    fn stop_updates(&mut self);

    /// Ask the platform to prompt for permission.
    fn request_authorization(&mut self, mode: AuthorizationMode);

    /// Most recent fix the platform has cached, if any.
    fn last_known_location(&self) -> Option<LocationSample>;

    fn authorization_status(&self) -> AuthorizationStatus;

    /// Whether location services are enabled device-wide.
    fn services_enabled(&self) -> bool;
}

/// Motion activity classifier.
pub trait ActivitySource: Send {
    fn is_available(&self) -> bool;

    fn start_updates(&mut self);

    fn stop_updates(&mut self);
}

/// An external object that owns location updates instead of the sensor.
///
/// While attached, its changes arrive through
/// `LocationManager::on_external_location`.
pub trait ExternalLocationObserver: Send {
    fn attach(&mut self);

    fn detach(&mut self);

    /// The location the observer currently holds.
    fn current_location(&self) -> Option<LocationSample>;
}
