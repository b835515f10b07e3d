//! # MindfulDesk Core Library
//!
//! Session and reminder scheduling engine for the MindfulDesk productivity
//! tool. The CLI and any GUI shell are thin layers over this crate.
//!
//! ## Architecture
//!
//! - **Timer**: focus/break session state machine, ticked once per second
//! - **Blocker**: distraction blocklist, time-boxed override window and the
//!   enforcement gate interface
//! - **Reminders**: independently scheduled health reminders, optionally
//!   gated on a running focus session
//! - **Storage**: SQLite authoritative store, JSON local cache, TOML config
//! - **Engine / Runtime**: composition root and its tokio driver
//!
//! ## Key Components
//!
//! - [`SchedulingEngine`]: every operation the presentation layer consumes
//! - [`FocusSessionMachine`], [`OverrideWindowMachine`], [`ReminderScheduler`]
//! - [`SettingsStore`]: authoritative-then-cache settings persistence
//! - [`NotifierGateway`]: best-effort notification delivery

pub mod blocker;
pub mod clock;
pub mod driver;
pub mod engine;
pub mod error;
pub mod events;
pub mod notify;
pub mod reminders;
pub mod runtime;
pub mod storage;
pub mod timer;

pub use blocker::{
    BlockItemType, BlockMode, BlockedItem, BlockerSettings, EnforcementGate, LocalGate,
    OverrideWindow, OverrideWindowMachine,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use driver::{DeadlineQueue, TimerRegistry, TimerSlot, TimerToken};
pub use engine::{
    BlockerOp, Committed, EngineOptions, EngineSnapshot, ReminderOp, SchedulingEngine,
    SettingsSources,
};
pub use error::{ConfigError, CoreError, DatabaseError, StoreError, ValidationError};
pub use events::Event;
pub use notify::{LogNotifier, Notification, Notifier, NotifierGateway};
pub use reminders::{HealthReminder, ReminderEdit, ReminderScheduler, ReminderSettings, ReminderType};
pub use storage::{
    Config, Database, LoadSource, LocalCache, Persistence, SettingsKey, SettingsStore, StoreJob,
};
pub use timer::{FocusSession, FocusSessionMachine, FocusSettings, SessionState, SessionType};
