//! Distraction blocker: the blocklist aggregate, its override window and the
//! enforcement gate they drive.
//!
//! [`Blocker`] is the only mutator of [`BlockerSettings`]. After every
//! mutation it pushes the resulting rule set to the gate, so a toggled-off
//! item is never engaged.

mod gate;
mod override_window;
mod settings;

pub use gate::{EnforcementGate, LocalGate};
pub use override_window::{OverrideWindow, OverrideWindowMachine};
pub use settings::{
    display_name_for, popular_distractions, BlockItemType, BlockMode, BlockedItem,
    BlockerSettings,
};

use chrono::{DateTime, Utc};

use crate::error::{Result, ValidationError};
use crate::events::Event;

pub struct Blocker {
    settings: BlockerSettings,
    window: OverrideWindowMachine,
    gate: Box<dyn EnforcementGate>,
}

impl Blocker {
    pub fn new(settings: BlockerSettings, gate: Box<dyn EnforcementGate>) -> Self {
        let mut blocker = Self {
            window: OverrideWindowMachine::new(settings.override_timeout),
            settings,
            gate,
        };
        blocker.sync_gate();
        blocker
    }

    pub fn settings(&self) -> &BlockerSettings {
        &self.settings
    }

    pub fn override_window(&self) -> &OverrideWindow {
        self.window.window()
    }

    /// False when the blocker is off or an override window is open.
    pub fn is_url_blocked(&self, url: &str) -> bool {
        !self.window.is_active() && self.settings.matching_item(url).is_some()
    }

    /// Disabling also ends any open override window.
    pub fn set_enabled(&mut self, enabled: bool, at: DateTime<Utc>) -> Option<Event> {
        self.settings.enabled = enabled;
        let ended = if enabled { None } else { self.end_override(at) };
        self.sync_gate();
        ended
    }

    pub fn set_mode(&mut self, mode: BlockMode) {
        self.settings.block_mode = mode;
        self.sync_gate();
    }

    pub fn add_item(
        &mut self,
        name: &str,
        url_pattern: &str,
        item_type: BlockItemType,
    ) -> Result<BlockedItem> {
        let item = BlockedItem::new(name, url_pattern, item_type)?;
        self.settings.blocked_items.push(item.clone());
        self.sync_gate();
        Ok(item)
    }

    pub fn add_popular(&mut self, url_pattern: &str) -> Result<BlockedItem> {
        self.add_item(&display_name_for(url_pattern), url_pattern, BlockItemType::Website)
    }

    pub fn remove_item(&mut self, id: &str) -> Result<BlockedItem> {
        let removed = self.settings.remove_item(id)?;
        self.sync_gate();
        Ok(removed)
    }

    pub fn toggle_item(&mut self, id: &str) -> Result<BlockedItem> {
        let item = self.settings.item_mut(id)?;
        item.is_active = !item.is_active;
        let item = item.clone();
        self.sync_gate();
        Ok(item)
    }

    pub fn set_item_active(&mut self, id: &str, active: bool) -> Result<BlockedItem> {
        let item = self.settings.item_mut(id)?;
        item.is_active = active;
        let item = item.clone();
        self.sync_gate();
        Ok(item)
    }

    /// Revoking `allow_override` ends any open window.
    pub fn set_override_policy(
        &mut self,
        allow_override: bool,
        timeout_seconds: u32,
        at: DateTime<Utc>,
    ) -> Result<Option<Event>> {
        ValidationError::check_min("overrideTimeoutSeconds", timeout_seconds, 1)?;
        self.settings.allow_override = allow_override;
        self.settings.override_timeout = timeout_seconds;
        self.window.set_timeout(timeout_seconds);
        Ok(if allow_override { None } else { self.end_override(at) })
    }

    /// Swap in a whole aggregate, e.g. after an authoritative reload.
    pub fn replace_settings(&mut self, settings: BlockerSettings, at: DateTime<Utc>) -> Option<Event> {
        self.settings = settings;
        self.window.set_timeout(self.settings.override_timeout);
        let ended = if self.settings.enabled && self.settings.allow_override {
            None
        } else {
            self.end_override(at)
        };
        self.sync_gate();
        ended
    }

    pub fn request_override(&mut self, duration_secs: u32, at: DateTime<Utc>) -> Result<Event> {
        self.window
            .request(duration_secs, &self.settings, self.gate.as_mut(), at)
    }

    pub fn end_override(&mut self, at: DateTime<Utc>) -> Option<Event> {
        self.window.end(self.gate.as_mut(), at)
    }

    pub fn tick_override(&mut self, at: DateTime<Utc>) -> Option<Event> {
        self.window.tick(self.gate.as_mut(), at)
    }

    fn sync_gate(&mut self) {
        let patterns = self.settings.active_patterns();
        self.gate.apply_rules(self.settings.block_mode, &patterns);
    }
}
