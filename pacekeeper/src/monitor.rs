//! Application foreground/background tracking.
//!
//! The monitor only records state; the manager decides what pausing or
//! resuming means. Signals arriving while the monitor is not installed are
//! dropped.

/// What a lifecycle signal should trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleSignal {
    /// The application moved to the background.
    EnteredBackground,
    /// The application returned to the foreground.
    ReturnedToForeground,
}

#[derive(Debug, Default)]
pub struct BackgroundMonitor {
    installed: bool,
    backgrounded: bool,
}

impl BackgroundMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_installed(&self) -> bool {
        self.installed
    }

    pub fn is_backgrounded(&self) -> bool {
        self.backgrounded
    }

    /// Start listening. Returns `false` if already installed.
    pub fn install(&mut self) -> bool {
        if self.installed {
            return false;
        }
        tracing::debug!("Background monitor installed");
        self.installed = true;
        true
    }

    /// Stop listening and forget the background flag.
    pub fn uninstall(&mut self) {
        if self.installed {
            tracing::debug!("Background monitor uninstalled");
        }
        self.installed = false;
        self.backgrounded = false;
    }

    /// Handle "will resign active".
    pub fn will_resign_active(&mut self) -> Option<LifecycleSignal> {
        if !self.installed {
            return None;
        }
        self.backgrounded = true;
        Some(LifecycleSignal::EnteredBackground)
    }

    /// Handle "did become active". Ignored unless previously backgrounded.
    pub fn did_become_active(&mut self) -> Option<LifecycleSignal> {
        if !self.installed || !self.backgrounded {
            return None;
        }
        self.backgrounded = false;
        Some(LifecycleSignal::ReturnedToForeground)
    }
}
