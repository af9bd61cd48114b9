//! In-memory collaborators that record every call.
//!
//! Each simulated type hands out a cloneable probe sharing its state, so
//! calls stay observable after the collaborator has been moved into a
//! manager or a driver task.

use std::sync::Arc;

use parking_lot::Mutex;

use super::{ActivitySource, ExternalLocationObserver, LocationSource, SensorSettings};
use crate::authorization::{AuthorizationMode, AuthorizationStatus};
use crate::location::LocationSample;

#[derive(Debug, Default)]
struct SourceState {
    status: AuthorizationStatus,
    services_enabled: bool,
    last_known: Option<LocationSample>,
    settings: Option<SensorSettings>,
    updating: bool,
    starts: u32,
    stops: u32,
    requests: Vec<AuthorizationMode>,
}

/// Location source driven by test code or a replayed trace.
#[derive(Debug, Clone)]
pub struct SimulatedSource {
    state: Arc<Mutex<SourceState>>,
}

impl SimulatedSource {
    /// A source with services enabled and the given initial status.
    pub fn new(status: AuthorizationStatus) -> Self {
        let state = SourceState {
            status,
            services_enabled: true,
            ..Default::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn authorized() -> Self {
        Self::new(AuthorizationStatus::AuthorizedWhenInUse)
    }

    pub fn probe(&self) -> SourceProbe {
        SourceProbe {
            state: Arc::clone(&self.state),
        }
    }
}

impl Default for SimulatedSource {
    fn default() -> Self {
        Self::new(AuthorizationStatus::NotDetermined)
    }
}

impl LocationSource for SimulatedSource {
    fn configure(&mut self, settings: &SensorSettings) {
        self.state.lock().settings = Some(*settings);
    }

    fn start_updates(&mut self) {
        let mut state = self.state.lock();
        state.updating = true;
        state.starts += 1;
    }

    fn stop_updates(&mut self) {
        let mut state = self.state.lock();
        state.updating = false;
        state.stops += 1;
    }

    fn request_authorization(&mut self, mode: AuthorizationMode) {
        self.state.lock().requests.push(mode);
    }

    fn last_known_location(&self) -> Option<LocationSample> {
        self.state.lock().last_known.clone()
    }

    fn authorization_status(&self) -> AuthorizationStatus {
        self.state.lock().status
    }

    fn services_enabled(&self) -> bool {
        self.state.lock().services_enabled
    }
}

/// Shared view of a [`SimulatedSource`].
#[derive(Debug, Clone)]
pub struct SourceProbe {
    state: Arc<Mutex<SourceState>>,
}

impl SourceProbe {
    pub fn set_status(&self, status: AuthorizationStatus) {
        self.state.lock().status = status;
    }

    pub fn set_services_enabled(&self, enabled: bool) {
        self.state.lock().services_enabled = enabled;
    }

    pub fn set_last_known(&self, sample: Option<LocationSample>) {
        self.state.lock().last_known = sample;
    }

    pub fn settings(&self) -> Option<SensorSettings> {
        self.state.lock().settings
    }

    pub fn is_updating(&self) -> bool {
        self.state.lock().updating
    }

    /// Number of `start_updates` calls.
    pub fn starts(&self) -> u32 {
        self.state.lock().starts
    }

    /// Number of `stop_updates` calls.
    pub fn stops(&self) -> u32 {
        self.state.lock().stops
    }

    /// Authorization requests forwarded so far.
    pub fn requests(&self) -> Vec<AuthorizationMode> {
        self.state.lock().requests.clone()
    }
}

#[derive(Debug, Default)]
struct ActivityState {
    available: bool,
    running: bool,
    starts: u32,
}

#[derive(Debug, Clone)]
pub struct SimulatedActivitySource {
    state: Arc<Mutex<ActivityState>>,
}

impl SimulatedActivitySource {
    pub fn new(available: bool) -> Self {
        let state = ActivityState {
            available,
            ..Default::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn probe(&self) -> ActivityProbe {
        ActivityProbe {
            state: Arc::clone(&self.state),
        }
    }
}

impl ActivitySource for SimulatedActivitySource {
    fn is_available(&self) -> bool {
        self.state.lock().available
    }

    fn start_updates(&mut self) {
        let mut state = self.state.lock();
        state.running = true;
        state.starts += 1;
    }

    fn stop_updates(&mut self) {
        self.state.lock().running = false;
    }
}

#[derive(Debug, Clone)]
pub struct ActivityProbe {
    state: Arc<Mutex<ActivityState>>,
}

impl ActivityProbe {
    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    pub fn starts(&self) -> u32 {
        self.state.lock().starts
    }
}

#[derive(Debug, Default)]
struct ObserverState {
    attached: bool,
    attaches: u32,
    detaches: u32,
    current: Option<LocationSample>,
}

/// External observer holding a settable location.
#[derive(Debug, Clone, Default)]
pub struct SimulatedObserver {
    state: Arc<Mutex<ObserverState>>,
}

impl SimulatedObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn probe(&self) -> ObserverProbe {
        ObserverProbe {
            state: Arc::clone(&self.state),
        }
    }
}

impl ExternalLocationObserver for SimulatedObserver {
    fn attach(&mut self) {
        let mut state = self.state.lock();
        state.attached = true;
        state.attaches += 1;
    }

    fn detach(&mut self) {
        let mut state = self.state.lock();
        state.attached = false;
        state.detaches += 1;
    }

    fn current_location(&self) -> Option<LocationSample> {
        self.state.lock().current.clone()
    }
}

#[derive(Debug, Clone)]
pub struct ObserverProbe {
    state: Arc<Mutex<ObserverState>>,
}

impl ObserverProbe {
    pub fn set_current(&self, sample: Option<LocationSample>) {
        self.state.lock().current = sample;
    }

    pub fn is_attached(&self) -> bool {
        self.state.lock().attached
    }

    pub fn attaches(&self) -> u32 {
        self.state.lock().attaches
    }

    pub fn detaches(&self) -> u32 {
        self.state.lock().detaches
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_sees_calls_after_move() {
        let source = SimulatedSource::authorized();
        let probe = source.probe();

        let mut boxed: Box<dyn LocationSource> = Box::new(source);
        boxed.start_updates();
        boxed.start_updates();
        boxed.stop_updates();
        boxed.request_authorization(AuthorizationMode::Always);

        assert_eq!(probe.starts(), 2);
        assert_eq!(probe.stops(), 1);
        assert!(!probe.is_updating());
        assert_eq!(probe.requests(), vec![AuthorizationMode::Always]);
    }

    #[test]
    fn test_probe_controls_status() {
        let source = SimulatedSource::default();
        let probe = source.probe();
        assert_eq!(source.authorization_status(), AuthorizationStatus::NotDetermined);

        probe.set_status(AuthorizationStatus::Denied);
        probe.set_services_enabled(false);
        assert_eq!(source.authorization_status(), AuthorizationStatus::Denied);
        assert!(!source.services_enabled());
    }

    #[test]
    fn test_observer_pairs() {
        let mut observer = SimulatedObserver::new();
        let probe = observer.probe();
        observer.attach();
        observer.detach();
        assert_eq!((probe.attaches(), probe.detaches()), (1, 1));
        assert!(!probe.is_attached());
    }
}
