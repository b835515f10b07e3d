//! Time-boxed bypass of blocker enforcement.
//!
//! ```text
//! Inactive -> Active -> Inactive
//! ```
//!
//! The window and the enforcement gate always agree: the gate is opened
//! before the window reports Active and closed before it reports Inactive.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::gate::EnforcementGate;
use super::settings::BlockerSettings;
use crate::error::{CoreError, Result, ValidationError};
use crate::events::Event;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideWindow {
    pub active: bool,
    pub remaining_seconds: u32,
    /// Configured ceiling for a single window.
    pub timeout_seconds: u32,
}

impl OverrideWindow {
    fn inactive(timeout_seconds: u32) -> Self {
        Self {
            active: false,
            remaining_seconds: 0,
            timeout_seconds,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OverrideWindowMachine {
    window: OverrideWindow,
}

impl OverrideWindowMachine {
    pub fn new(timeout_seconds: u32) -> Self {
        Self {
            window: OverrideWindow::inactive(timeout_seconds),
        }
    }

    pub fn window(&self) -> &OverrideWindow {
        &self.window
    }

    pub fn is_active(&self) -> bool {
        self.window.active
    }

    /// Update the ceiling. A running window keeps its countdown.
    pub fn set_timeout(&mut self, timeout_seconds: u32) {
        self.window.timeout_seconds = timeout_seconds;
    }

    /// Open a window of `min(requested_secs, overrideTimeout)` seconds.
    pub fn request(
        &mut self,
        requested_secs: u32,
        settings: &BlockerSettings,
        gate: &mut dyn EnforcementGate,
        at: DateTime<Utc>,
    ) -> Result<Event> {
        if !settings.enabled {
            return Err(CoreError::NotPermitted("blocker is disabled".into()));
        }
        if !settings.allow_override {
            return Err(CoreError::NotPermitted("overrides are not allowed".into()));
        }
        if self.window.active {
            return Err(CoreError::invalid_transition("request override", "override active"));
        }
        ValidationError::check_min("durationSeconds", requested_secs, 1)?;

        let duration = requested_secs.min(settings.override_timeout);
        if duration == 0 {
            return Err(CoreError::NotPermitted("override timeout is zero".into()));
        }
        if !gate.request_bypass(duration) {
            return Err(CoreError::NotPermitted(
                "enforcement gate refused the bypass".into(),
            ));
        }

        self.window = OverrideWindow {
            active: true,
            remaining_seconds: duration,
            timeout_seconds: settings.override_timeout,
        };
        Ok(Event::OverrideStarted {
            duration_seconds: duration,
            at,
        })
    }

    /// Call once per elapsed second. Ends the window when it reaches zero.
    pub fn tick(&mut self, gate: &mut dyn EnforcementGate, at: DateTime<Utc>) -> Option<Event> {
        if !self.window.active {
            return None;
        }
        self.window.remaining_seconds = self.window.remaining_seconds.saturating_sub(1);
        if self.window.remaining_seconds == 0 {
            return self.close(gate, true, at);
        }
        None
    }

    /// Idempotent. The gate is closed even when no window is active.
    pub fn end(&mut self, gate: &mut dyn EnforcementGate, at: DateTime<Utc>) -> Option<Event> {
        self.close(gate, false, at)
    }

    fn close(
        &mut self,
        gate: &mut dyn EnforcementGate,
        expired: bool,
        at: DateTime<Utc>,
    ) -> Option<Event> {
        gate.end_bypass();
        let was_active = self.window.active;
        self.window = OverrideWindow::inactive(self.window.timeout_seconds);
        was_active.then_some(Event::OverrideEnded { expired, at })
    }
}
