//! Typed events raised to application code.
//!
//! Every event kind has its own tokio `broadcast` channel so consumers can
//! subscribe to exactly what they need, plus a combined channel carrying
//! [`LocationEvent`] for consumers that want the full ordered stream.
//!
//! Sending never blocks and never fails from the manager's point of view: a
//! channel without receivers simply drops the event.
//!
//! # Example
//!
//! ```
//! use pacekeeper::events::{EventHub, IntervalUpdate};
//! use pacekeeper::location::LocationSample;
//! use std::time::Duration;
//!
//! let hub = EventHub::new(16);
//! let mut rx = hub.subscribe_interval_updates();
//!
//! hub.emit_interval_update(LocationSample::new(53.55, 9.99), Duration::from_secs(5));
//!
//! let update: IntervalUpdate = rx.try_recv().unwrap();
//! assert_eq!(update.interval, Duration::from_secs(5));
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::location::LocationSample;

/// Default capacity of each event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Failures reported through the event channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum LocationError {
    /// First-fix budget was exhausted without a location.
    #[error("could not detect a first location within the retry budget")]
    CannotDetectFirstLocation,

    /// An operation needed location permission that is not granted.
    #[error("location updates are not authorized")]
    NotAuthorized,

    /// Motion activity classification is not available on this device.
    #[error("motion activity source is unavailable")]
    ActivitySourceUnavailable,
}

/// Status notifications raised to application code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Notification {
    /// Updates were requested without permission.
    NotAuthorized,
    /// Entered the allowed permission level.
    AuthorizationAllowed,
    /// Entered the denied permission level.
    AuthorizationDenied,
    /// The user granted permission (prompt answer or settings change).
    UserAllowedAuthorization,
    /// The user refused permission (prompt answer or settings change).
    UserDeniedAuthorization,
    /// The application lost focus.
    AppInBackground,
    /// The application became active again.
    AppActive,
}

impl Notification {
    /// Short machine-friendly name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Notification::NotAuthorized => "not_authorized",
            Notification::AuthorizationAllowed => "authorization_allowed",
            Notification::AuthorizationDenied => "authorization_denied",
            Notification::UserAllowedAuthorization => "user_allowed_authorization",
            Notification::UserDeniedAuthorization => "user_denied_authorization",
            Notification::AppInBackground => "app_in_background",
            Notification::AppActive => "app_active",
        }
    }
}

impl std::fmt::Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sample admitted by the interval gate.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalUpdate {
    pub sample: LocationSample,
    /// Interval the gate selected, or the elapsed time for forced updates.
    pub interval: Duration,
}

/// A sample admitted by the distance gate.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceUpdate {
    pub sample: LocationSample,
    /// Distance accumulated since the previous distance update, in meters.
    pub distance_m: f64,
}

/// Heartbeat re-emission of the latest sample.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopUpdate {
    pub sample: Option<LocationSample>,
    pub interval: Duration,
}

/// Every event the manager can raise, in emission order.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationEvent {
    FirstLocation(LocationSample),
    Updated(LocationSample),
    UpdatedAfterInterval(IntervalUpdate),
    UpdatedAfterDistance(DistanceUpdate),
    UpdatedInLoopMode(LoopUpdate),
    Error(LocationError),
    Notification(Notification),
}

impl LocationEvent {
    /// Short machine-friendly name of the event kind.
    pub fn kind(&self) -> &'static str {
        match self {
            LocationEvent::FirstLocation(_) => "first_location",
            LocationEvent::Updated(_) => "updated",
            LocationEvent::UpdatedAfterInterval(_) => "updated_after_interval",
            LocationEvent::UpdatedAfterDistance(_) => "updated_after_distance",
            LocationEvent::UpdatedInLoopMode(_) => "updated_in_loop_mode",
            LocationEvent::Error(_) => "error",
            LocationEvent::Notification(_) => "notification",
        }
    }

    /// The sample carried by the event, if any.
    pub fn sample(&self) -> Option<&LocationSample> {
        match self {
            LocationEvent::FirstLocation(s) | LocationEvent::Updated(s) => Some(s),
            LocationEvent::UpdatedAfterInterval(u) => Some(&u.sample),
            LocationEvent::UpdatedAfterDistance(u) => Some(&u.sample),
            LocationEvent::UpdatedInLoopMode(u) => u.sample.as_ref(),
            LocationEvent::Error(_) | LocationEvent::Notification(_) => None,
        }
    }
}

/// Independently subscribable event channels.
///
/// Cloning the hub shares the channels.
#[derive(Debug, Clone)]
pub struct EventHub {
    first_location: broadcast::Sender<LocationSample>,
    updated: broadcast::Sender<LocationSample>,
    interval: broadcast::Sender<IntervalUpdate>,
    distance: broadcast::Sender<DistanceUpdate>,
    loop_mode: broadcast::Sender<LoopUpdate>,
    errors: broadcast::Sender<LocationError>,
    notifications: broadcast::Sender<Notification>,
    all: broadcast::Sender<LocationEvent>,
}

impl EventHub {
    /// Create a hub whose channels each buffer `capacity` events.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            first_location: broadcast::channel(capacity).0,
            updated: broadcast::channel(capacity).0,
            interval: broadcast::channel(capacity).0,
            distance: broadcast::channel(capacity).0,
            loop_mode: broadcast::channel(capacity).0,
            errors: broadcast::channel(capacity).0,
            notifications: broadcast::channel(capacity).0,
            all: broadcast::channel(capacity).0,
        }
    }

    pub fn subscribe_first_location(&self) -> broadcast::Receiver<LocationSample> {
        self.first_location.subscribe()
    }

    pub fn subscribe_updates(&self) -> broadcast::Receiver<LocationSample> {
        self.updated.subscribe()
    }

    pub fn subscribe_interval_updates(&self) -> broadcast::Receiver<IntervalUpdate> {
        self.interval.subscribe()
    }

    pub fn subscribe_distance_updates(&self) -> broadcast::Receiver<DistanceUpdate> {
        self.distance.subscribe()
    }

    pub fn subscribe_loop_updates(&self) -> broadcast::Receiver<LoopUpdate> {
        self.loop_mode.subscribe()
    }

    pub fn subscribe_errors(&self) -> broadcast::Receiver<LocationError> {
        self.errors.subscribe()
    }

    pub fn subscribe_notifications(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    /// Subscribe to every event in emission order.
    pub fn subscribe_all(&self) -> broadcast::Receiver<LocationEvent> {
        self.all.subscribe()
    }

    pub fn emit_first_location(&self, sample: LocationSample) {
        tracing::info!(
            latitude = sample.latitude(),
            longitude = sample.longitude(),
            "First location acquired"
        );
        let _ = self.first_location.send(sample.clone());
        let _ = self.all.send(LocationEvent::FirstLocation(sample));
    }

    pub fn emit_updated(&self, sample: LocationSample) {
        let _ = self.updated.send(sample.clone());
        let _ = self.all.send(LocationEvent::Updated(sample));
    }

    pub fn emit_interval_update(&self, sample: LocationSample, interval: Duration) {
        tracing::debug!(
            interval_secs = interval.as_secs_f64(),
            speed = ?sample.speed,
            "Location updated after interval"
        );
        let update = IntervalUpdate { sample, interval };
        let _ = self.interval.send(update.clone());
        let _ = self.all.send(LocationEvent::UpdatedAfterInterval(update));
    }

    pub fn emit_distance_update(&self, sample: LocationSample, distance_m: f64) {
        tracing::debug!(distance_m, "Location updated after distance");
        let update = DistanceUpdate { sample, distance_m };
        let _ = self.distance.send(update.clone());
        let _ = self.all.send(LocationEvent::UpdatedAfterDistance(update));
    }

    pub fn emit_loop_update(&self, sample: Option<LocationSample>, interval: Duration) {
        let update = LoopUpdate { sample, interval };
        let _ = self.loop_mode.send(update.clone());
        let _ = self.all.send(LocationEvent::UpdatedInLoopMode(update));
    }

    pub fn emit_error(&self, error: LocationError) {
        tracing::warn!(%error, "Location manager error");
        let _ = self.errors.send(error);
        let _ = self.all.send(LocationEvent::Error(error));
    }

    pub fn emit_notification(&self, notification: Notification) {
        tracing::info!(%notification, "Location manager notification");
        let _ = self.notifications.send(notification);
        let _ = self.all.send(LocationEvent::Notification(notification));
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

/// Drain every event currently buffered in `rx`.
///
/// Lagged receivers skip the dropped events and keep draining.
pub fn drain<T: Clone>(rx: &mut broadcast::Receiver<T>) -> Vec<T> {
    let mut out = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => out.push(event),
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Event receiver lagged");
            }
            Err(_) => break,
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_receivers_does_not_panic() {
        let hub = EventHub::default();
        hub.emit_updated(LocationSample::new(1.0, 2.0));
        hub.emit_error(LocationError::NotAuthorized);
    }

    #[test]
    fn test_typed_channel_and_combined_channel() {
        let hub = EventHub::new(8);
        let mut updates = hub.subscribe_updates();
        let mut errors = hub.subscribe_errors();
        let mut all = hub.subscribe_all();

        let sample = LocationSample::new(53.55, 9.99);
        hub.emit_updated(sample.clone());
        hub.emit_notification(Notification::AppActive);

        assert_eq!(drain(&mut updates), vec![sample.clone()]);
        assert!(drain(&mut errors).is_empty());
        assert_eq!(
            drain(&mut all),
            vec![
                LocationEvent::Updated(sample),
                LocationEvent::Notification(Notification::AppActive)
            ]
        );
    }

    #[test]
    fn test_cloned_hub_shares_channels() {
        let hub = EventHub::new(8);
        let clone = hub.clone();
        let mut rx = hub.subscribe_notifications();

        clone.emit_notification(Notification::AppInBackground);
        assert_eq!(drain(&mut rx), vec![Notification::AppInBackground]);
    }

    #[test]
    fn test_drain_survives_lag() {
        let hub = EventHub::new(2);
        let mut rx = hub.subscribe_errors();
        for _ in 0..5 {
            hub.emit_error(LocationError::NotAuthorized);
        }
        // Only the last `capacity` events survive
        assert_eq!(drain(&mut rx).len(), 2);
    }

    #[test]
    fn test_event_sample_accessor() {
        let sample = LocationSample::new(1.0, 2.0);
        let event = LocationEvent::UpdatedInLoopMode(LoopUpdate {
            sample: Some(sample.clone()),
            interval: Duration::from_secs(5),
        });
        assert_eq!(event.sample(), Some(&sample));
        assert_eq!(event.kind(), "updated_in_loop_mode");
        assert!(LocationEvent::Error(LocationError::NotAuthorized)
            .sample()
            .is_none());
    }

    #[test]
    fn test_error_display() {
        let err = LocationError::CannotDetectFirstLocation;
        assert!(err.to_string().contains("first location"));
    }
}
