//! Location session manager.
//!
//! [`LocationManager`] is a synchronous state machine. Platform callbacks
//! arrive through the `on_*` methods, timers are pumped through
//! [`LocationManager::fire_due_timers`], and everything the application
//! sees goes out through the [`EventHub`]. Fixes and forced updates pump any
//! already-due timers first, so an expired interval never blocks a late fix.
//!
//! The manager never blocks and never spawns; see [`crate::runtime`] for
//! drivers that feed it from tokio or from a recorded trace.

mod config;
mod state;

pub use config::{ManagerConfig, MAX_CONFIGURED_DURATION};
pub use state::SessionState;

use std::sync::Arc;
use std::time::Instant;

use crate::authorization::{
    AuthorizationMode, AuthorizationStatus, PermissionTracker, UpdatePathAction,
};
use crate::clock::{Clock, SystemClock};
use crate::error::{ConfigError, ManagerError};
use crate::events::{EventHub, LocationError, Notification};
use crate::first_fix::{FirstFixController, FirstFixPoll};
use crate::location::LocationSample;
use crate::monitor::BackgroundMonitor;
use crate::source::{ActivitySource, ExternalLocationObserver, LocationSource};
use crate::throttle::{MotionActivity, ThrottleController};
use crate::timer::{TimerKind, TimerRegistry};

/// Why the session is leaving `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    Pause,
    Background,
    Destroy,
}

struct ObserverSlot {
    observer: Box<dyn ExternalLocationObserver>,
    attached: bool,
}

/// Power-aware location update manager.
///
/// # Example
///
/// ```
/// use pacekeeper::{LocationManager, ManagerConfig, SessionState};
/// use pacekeeper::location::LocationSample;
/// use pacekeeper::source::SimulatedSource;
///
/// let mut manager = LocationManager::new(SimulatedSource::authorized(), ManagerConfig::default())
///     .unwrap();
/// let mut updates = manager.events().subscribe_updates();
///
/// manager.start();
/// assert_eq!(manager.state(), SessionState::Running);
///
/// manager.on_location(LocationSample::new(53.55, 9.99));
/// assert!(updates.try_recv().is_ok());
/// ```
pub struct LocationManager<S: LocationSource> {
    config: ManagerConfig,
    clock: Arc<dyn Clock>,
    source: S,
    activity: Option<Box<dyn ActivitySource>>,
    activity_running: bool,
    activity_error_reported: bool,
    observer: Option<ObserverSlot>,
    state: SessionState,
    /// Whether the application asked for updates and has not stopped them.
    started: bool,
    status: AuthorizationStatus,
    permissions: PermissionTracker,
    first_fix: FirstFixController,
    throttle: ThrottleController,
    monitor: BackgroundMonitor,
    timers: TimerRegistry,
    events: EventHub,
    latest: Option<LocationSample>,
}

impl<S: LocationSource> LocationManager<S> {
    /// Create a manager on the system clock.
    pub fn new(source: S, config: ManagerConfig) -> Result<Self, ConfigError> {
        Self::with_clock(source, config, Arc::new(SystemClock))
    }

    /// Create a manager reading time from `clock`.
    ///
    /// Pushes the sensor settings to `source` and reads its current
    /// authorization status.
    pub fn with_clock(
        mut source: S,
        config: ManagerConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        source.configure(&config.sensor);
        let status = source.authorization_status();

        tracing::debug!(
            %status,
            min_interval_secs = config.min_interval.as_secs_f64(),
            max_interval_secs = config.max_interval.as_secs_f64(),
            speed_threshold = config.speed_threshold,
            "Location manager created"
        );

        Ok(Self {
            first_fix: FirstFixController::new(
                config.first_fix_attempts,
                config.first_fix_poll_interval,
            ),
            throttle: ThrottleController::new(config.throttle_config()),
            events: EventHub::new(config.event_capacity),
            config,
            clock,
            source,
            activity: None,
            activity_running: false,
            activity_error_reported: false,
            observer: None,
            state: SessionState::Idle,
            started: false,
            status,
            permissions: PermissionTracker::new(),
            monitor: BackgroundMonitor::new(),
            timers: TimerRegistry::new(),
            latest: None,
        })
    }

    /// Attach a motion activity classifier.
    ///
    /// Only consulted when [`ManagerConfig::motion_activity`] is set.
    pub fn with_activity_source(mut self, activity: impl ActivitySource + 'static) -> Self {
        self.activity = Some(Box::new(activity));
        self
    }

    // ---------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether the application has asked for updates.
    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn events(&self) -> &EventHub {
        &self.events
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn authorization_status(&self) -> AuthorizationStatus {
        self.status
    }

    /// Latest sample received, emitted or not.
    pub fn latest_location(&self) -> Option<&LocationSample> {
        self.latest.as_ref()
    }

    pub fn is_backgrounded(&self) -> bool {
        self.monitor.is_backgrounded()
    }

    pub fn has_external_observer(&self) -> bool {
        self.observer.is_some()
    }

    /// Failed first-fix polls in the current budget.
    pub fn first_fix_attempts(&self) -> u32 {
        self.first_fix.attempts()
    }

    pub fn is_timer_armed(&self, kind: TimerKind) -> bool {
        self.timers.is_armed(kind)
    }

    pub fn armed_timer_count(&self) -> usize {
        self.timers.armed_count()
    }

    /// Earliest pending timer deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    // ---------------------------------------------------------------------
    // Operations
    // ---------------------------------------------------------------------

    /// Ask the platform for permission.
    ///
    /// Already-authorized managers only forward an upgrade from
    /// when-in-use to always.
    pub fn request_authorization(&mut self, mode: AuthorizationMode) {
        if self.rejected("request_authorization") {
            return;
        }

        if self.status.is_authorized() {
            if mode == AuthorizationMode::Always
                && self.status == AuthorizationStatus::AuthorizedWhenInUse
            {
                tracing::info!("Requesting authorization upgrade to always");
                self.source.request_authorization(mode);
            }
            return;
        }

        tracing::info!(%mode, status = %self.status, "Requesting location authorization");
        self.source.request_authorization(mode);
        if self.state == SessionState::Idle {
            self.transition(SessionState::AwaitingAuthorization);
        }
    }

    /// Start generating updates.
    ///
    /// Without permission this raises `Notification::NotAuthorized` and
    /// remembers the intent; granting permission later starts the session.
    pub fn start(&mut self) {
        if self.rejected("start") {
            return;
        }
        self.started = true;

        match self.state {
            SessionState::Running => {
                tracing::debug!("Already running");
                return;
            }
            SessionState::Backgrounded => {
                tracing::debug!("Start deferred until the application is active");
                return;
            }
            _ => {}
        }

        if !self.status.is_authorized() {
            tracing::warn!(status = %self.status, "Start requested without authorization");
            self.events.emit_notification(Notification::NotAuthorized);
            return;
        }

        self.first_fix.reset(&mut self.timers);
        if self.monitor.is_backgrounded() && !self.config.allow_background_updates {
            self.transition(SessionState::Backgrounded);
            return;
        }
        self.enter_running();
    }

    /// Request permission, then start.
    pub fn start_with_request(&mut self, mode: AuthorizationMode) {
        self.request_authorization(mode);
        self.start();
    }

    /// Stop generating updates. Always safe to call.
    pub fn stop(&mut self) {
        if self.state.is_destroyed() {
            return;
        }
        self.started = false;

        match self.state {
            SessionState::Running => {
                self.exit_running(Exit::Pause);
                self.transition(SessionState::Paused);
            }
            SessionState::Backgrounded => {
                self.first_fix.reset(&mut self.timers);
                self.transition(SessionState::Paused);
            }
            _ => self.first_fix.reset(&mut self.timers),
        }
    }

    /// Same as [`stop`](Self::stop).
    pub fn pause(&mut self) {
        self.stop();
    }

    /// Same as [`start`](Self::start).
    pub fn resume(&mut self) {
        self.start();
    }

    /// Deliver the current location immediately, bypassing the interval
    /// gate.
    ///
    /// Emits `Updated` and `UpdatedAfterInterval` carrying the time since
    /// the previous interval update.
    pub fn request_one_time_update(&mut self) {
        if self.rejected("request_one_time_update") {
            return;
        }
        if !self.status.is_authorized() {
            self.events.emit_error(LocationError::NotAuthorized);
            return;
        }
        self.force_update();
    }

    /// Start a fresh first-fix budget.
    pub fn restart_first_fix(&mut self) {
        if self.rejected("restart_first_fix") {
            return;
        }
        self.first_fix.reset(&mut self.timers);
        if self.state.is_running() {
            self.begin_first_fix();
        }
    }

    /// Route location updates through `observer` instead of the sensor.
    ///
    /// While registered, raw sensor fixes are ignored.
    pub fn register_external_observer(
        &mut self,
        observer: impl ExternalLocationObserver + 'static,
    ) -> Result<(), ManagerError> {
        if self.state.is_destroyed() {
            return Err(ManagerError::Destroyed);
        }
        if self.observer.is_some() {
            tracing::warn!("External observer already registered");
            return Err(ManagerError::ObserverAlreadyRegistered);
        }

        tracing::debug!("External observer registered");
        self.observer = Some(ObserverSlot {
            observer: Box::new(observer),
            attached: false,
        });
        if self.state.is_running() {
            self.attach_observer();
        }
        Ok(())
    }

    /// Remove the external observer, detaching it if attached.
    ///
    /// Returns the observer, or `None` if none was registered.
    pub fn unregister_external_observer(&mut self) -> Option<Box<dyn ExternalLocationObserver>> {
        let mut slot = self.observer.take()?;
        if slot.attached {
            slot.observer.detach();
        }
        tracing::debug!("External observer unregistered");
        Some(slot.observer)
    }

    /// Tear down every timer, subscription and observer. Terminal.
    pub fn destroy(&mut self) {
        if self.state.is_destroyed() {
            return;
        }
        if self.state.is_running() {
            self.exit_running(Exit::Destroy);
        }
        self.first_fix.reset(&mut self.timers);
        self.monitor.uninstall();
        self.unregister_external_observer();
        self.timers.cancel_all();
        self.timers.seal();
        self.started = false;
        self.latest = None;
        self.transition(SessionState::Destroyed);
    }

    /// Change whether updates continue in the background.
    pub fn set_allow_background_updates(&mut self, allow: bool) {
        if self.state.is_destroyed() || self.config.allow_background_updates == allow {
            return;
        }
        tracing::info!(allow, "Background updates setting changed");
        self.config.allow_background_updates = allow;

        if !self.monitor.is_backgrounded() {
            return;
        }
        match self.state {
            SessionState::Backgrounded if allow => {
                if self.status.is_authorized() && self.started {
                    self.enter_running();
                }
            }
            SessionState::Running if !allow => {
                self.exit_running(Exit::Background);
                self.transition(SessionState::Backgrounded);
            }
            _ => {}
        }
    }

    // ---------------------------------------------------------------------
    // Permission queries
    // ---------------------------------------------------------------------

    /// Call `f` with the services-enabled flag if access is denied.
    pub fn if_access_denied(&self, f: impl FnOnce(bool)) {
        if self.status == AuthorizationStatus::Denied {
            f(self.source.services_enabled());
        }
    }

    /// Call `f` with the services-enabled flag if access is restricted.
    pub fn if_access_restricted(&self, f: impl FnOnce(bool)) {
        if self.status == AuthorizationStatus::Restricted {
            f(self.source.services_enabled());
        }
    }

    /// Call `f` with the services-enabled flag if the user was not asked yet.
    pub fn if_access_not_determined(&self, f: impl FnOnce(bool)) {
        if self.status == AuthorizationStatus::NotDetermined {
            f(self.source.services_enabled());
        }
    }

    /// Always call `f` with the services-enabled flag and the current status.
    pub fn access_status(&self, f: impl FnOnce(bool, AuthorizationStatus)) {
        f(self.source.services_enabled(), self.status);
    }

    // ---------------------------------------------------------------------
    // Inputs
    // ---------------------------------------------------------------------

    /// A raw fix from the sensor.
    pub fn on_location(&mut self, sample: LocationSample) {
        if self.state.is_destroyed() {
            return;
        }
        if self.observer.is_some() {
            tracing::trace!("Sensor fix ignored while an external observer is registered");
            return;
        }
        self.ingest(sample);
    }

    /// A location change reported by the attached external observer.
    pub fn on_external_location(&mut self, sample: LocationSample) {
        if self.state.is_destroyed() {
            return;
        }
        let attached = self.observer.as_ref().is_some_and(|slot| slot.attached);
        if attached {
            self.ingest(sample);
        } else {
            tracing::trace!("External location ignored, no attached observer");
        }
    }

    /// The platform reported a permission change.
    pub fn on_authorization_changed(&mut self, status: AuthorizationStatus) {
        if self.state.is_destroyed() {
            return;
        }
        self.status = status;

        let outcome = self
            .permissions
            .on_status(status, self.monitor.is_backgrounded());
        for notification in outcome.notifications {
            self.events.emit_notification(notification);
        }

        match outcome.action {
            UpdatePathAction::Start => self.on_permission_granted(),
            UpdatePathAction::Stop => self.on_permission_revoked(),
            UpdatePathAction::None => {}
        }
    }

    /// Motion classification changed.
    pub fn on_activity(&mut self, activity: MotionActivity) {
        if self.state.is_destroyed() {
            return;
        }
        self.throttle.set_activity(activity);
    }

    /// The application is about to move to the background.
    pub fn on_app_will_resign_active(&mut self) {
        if self.state.is_destroyed() || self.monitor.will_resign_active().is_none() {
            return;
        }
        if self.state.is_running() && !self.config.allow_background_updates {
            self.exit_running(Exit::Background);
            self.transition(SessionState::Backgrounded);
        }
        self.events.emit_notification(Notification::AppInBackground);
    }

    /// The application became active again.
    pub fn on_app_did_become_active(&mut self) {
        if self.state.is_destroyed() || self.monitor.did_become_active().is_none() {
            return;
        }
        if self.state == SessionState::Backgrounded {
            if self.status.is_authorized() && self.started {
                self.enter_running();
            } else {
                self.transition(SessionState::Paused);
            }
        }
        self.force_update();
        self.events.emit_notification(Notification::AppActive);
    }

    /// Fire every timer whose deadline has passed. Returns how many fired.
    pub fn fire_due_timers(&mut self) -> usize {
        if self.state.is_destroyed() {
            return 0;
        }
        let now = self.clock.now();
        let mut fired = 0;
        while let Some(kind) = self.timers.pop_due(now) {
            fired += 1;
            tracing::trace!(timer = %kind, "Timer fired");
            match kind {
                TimerKind::FirstFix => self.poll_first_fix(),
                TimerKind::Throttle => {}
                TimerKind::Loop => {
                    if self.state.is_running() {
                        let current = self.current_location();
                        self.events
                            .emit_loop_update(current, self.throttle.loop_interval());
                    }
                }
            }
        }
        fired
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    fn rejected(&self, operation: &'static str) -> bool {
        if self.state.is_destroyed() {
            tracing::warn!(operation, "Operation on destroyed location manager");
            return true;
        }
        false
    }

    fn transition(&mut self, to: SessionState) {
        if self.state != to {
            tracing::info!(from = %self.state, to = %to, "Session state changed");
            self.state = to;
        }
    }

    fn on_permission_granted(&mut self) {
        self.monitor.install();
        match self.state {
            SessionState::AwaitingAuthorization => {
                if self.started {
                    self.enter_running();
                } else {
                    self.transition(SessionState::Idle);
                }
            }
            SessionState::Idle | SessionState::Paused if self.started => {
                if self.monitor.is_backgrounded() && !self.config.allow_background_updates {
                    self.transition(SessionState::Backgrounded);
                } else {
                    self.enter_running();
                }
            }
            _ => {}
        }
    }

    fn on_permission_revoked(&mut self) {
        match self.state {
            SessionState::Running => {
                self.exit_running(Exit::Pause);
                self.transition(SessionState::Paused);
            }
            SessionState::Backgrounded => {
                self.first_fix.reset(&mut self.timers);
                self.transition(SessionState::Paused);
            }
            SessionState::AwaitingAuthorization => self.transition(SessionState::Idle),
            _ => {}
        }
    }

    fn enter_running(&mut self) {
        self.transition(SessionState::Running);
        let now = self.clock.now();

        self.source.start_updates();
        self.attach_observer();
        self.start_activity();
        if !self.first_fix.is_acquired() {
            self.begin_first_fix();
        }
        self.throttle.arm_loop(&mut self.timers, now);
        self.monitor.install();
    }

    fn exit_running(&mut self, exit: Exit) {
        tracing::debug!(?exit, "Leaving running state");
        self.source.stop_updates();
        if let Some(slot) = self.observer.as_mut() {
            if slot.attached {
                slot.observer.detach();
                slot.attached = false;
            }
        }
        if self.activity_running {
            if let Some(activity) = self.activity.as_mut() {
                activity.stop_updates();
            }
            self.activity_running = false;
        }
        self.throttle.halt(&mut self.timers);
        match exit {
            Exit::Background => self.first_fix.suspend(&mut self.timers),
            Exit::Pause | Exit::Destroy => self.first_fix.reset(&mut self.timers),
        }
    }

    fn attach_observer(&mut self) {
        let current = match self.observer.as_mut() {
            Some(slot) if !slot.attached => {
                slot.observer.attach();
                slot.attached = true;
                slot.observer.current_location()
            }
            _ => return,
        };
        if let Some(sample) = current {
            self.ingest(sample);
        }
    }

    fn start_activity(&mut self) {
        if !self.config.motion_activity || self.activity_running {
            return;
        }
        match self.activity.as_mut() {
            Some(activity) if activity.is_available() => {
                activity.start_updates();
                self.activity_running = true;
                self.throttle.set_activity_available(true);
            }
            _ => {
                self.throttle.set_activity_available(false);
                if !self.activity_error_reported {
                    self.activity_error_reported = true;
                    self.events
                        .emit_error(LocationError::ActivitySourceUnavailable);
                }
            }
        }
    }

    fn begin_first_fix(&mut self) {
        let now = self.clock.now();
        if self.first_fix.begin(&mut self.timers, now) {
            self.poll_first_fix();
        }
    }

    fn poll_first_fix(&mut self) {
        let current = self.current_location();
        match self.first_fix.poll(current.as_ref(), &mut self.timers) {
            FirstFixPoll::Acquired(sample) => self.events.emit_first_location(sample),
            FirstFixPoll::Exhausted => self
                .events
                .emit_error(LocationError::CannotDetectFirstLocation),
            FirstFixPoll::Pending { .. } | FirstFixPoll::Inactive => {}
        }
    }

    /// The observer's location when one is registered, otherwise the latest
    /// fix or the platform's cached one.
    fn current_location(&self) -> Option<LocationSample> {
        match &self.observer {
            Some(slot) => slot.observer.current_location(),
            None => self
                .latest
                .clone()
                .or_else(|| self.source.last_known_location()),
        }
    }

    fn ingest(&mut self, sample: LocationSample) {
        // Expiries that precede this fix take effect first
        self.fire_due_timers();
        self.latest = Some(sample.clone());
        if !self.state.is_running() {
            tracing::trace!(state = %self.state, "Fix cached, session not running");
            return;
        }

        let now = self.clock.now();
        self.events.emit_updated(sample.clone());

        let decision = self.throttle.on_sample(&sample, &mut self.timers, now);
        match (decision.interval, decision.distance_m) {
            (Some(interval), Some(distance_m)) => {
                self.events.emit_interval_update(sample.clone(), interval);
                self.events.emit_distance_update(sample, distance_m);
            }
            (Some(interval), None) => self.events.emit_interval_update(sample, interval),
            (None, Some(distance_m)) => self.events.emit_distance_update(sample, distance_m),
            (None, None) => {}
        }
    }

    fn force_update(&mut self) {
        self.fire_due_timers();
        if !self.state.is_running() {
            tracing::debug!(state = %self.state, "Forced update skipped, session not running");
            return;
        }
        let Some(sample) = self.current_location() else {
            tracing::debug!("Forced update skipped, no location yet");
            return;
        };

        let now = self.clock.now();
        self.events.emit_updated(sample.clone());
        let elapsed = self.throttle.force(&sample, &mut self.timers, now);
        self.events.emit_interval_update(sample, elapsed);
    }
}

impl<S: LocationSource> std::fmt::Debug for LocationManager<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationManager")
            .field("state", &self.state)
            .field("started", &self.started)
            .field("status", &self.status)
            .field("observer", &self.observer.is_some())
            .field("timers", &self.timers.armed_count())
            .finish()
    }
}
