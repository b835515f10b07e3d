//! Best-effort user notifications.
//!
//! The engine never waits on or retries a notification. Permission is asked
//! once when the gateway is built; a refusal turns every later delivery into
//! a logged [`CoreError::NotifierUnavailable`].

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{CoreError, Result};

const HISTORY_LIMIT: usize = 100;

/// OS-level notification sink.
pub trait Notifier: Send {
    fn permission_granted(&mut self) -> bool;

    /// Returns false when the notification could not be shown.
    fn notify(&mut self, title: &str, body: &str) -> bool;
}

/// Writes notifications to the tracing log. Used by the CLI.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn permission_granted(&mut self) -> bool {
        true
    }

    fn notify(&mut self, title: &str, body: &str) -> bool {
        info!(target: "mindfuldesk::notification", %title, %body, "notification");
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub at: DateTime<Utc>,
    pub delivered: bool,
}

pub struct NotifierGateway {
    notifier: Box<dyn Notifier>,
    permitted: bool,
    history: VecDeque<Notification>,
}

impl NotifierGateway {
    pub fn new(mut notifier: Box<dyn Notifier>) -> Self {
        let permitted = notifier.permission_granted();
        if !permitted {
            warn!("notification permission not granted; alerts will only be logged");
        }
        Self {
            notifier,
            permitted,
            history: VecDeque::new(),
        }
    }

    pub fn is_permitted(&self) -> bool {
        self.permitted
    }

    /// Most recent last.
    pub fn history(&self) -> impl Iterator<Item = &Notification> {
        self.history.iter()
    }

    pub fn deliver(&mut self, title: &str, body: &str, at: DateTime<Utc>) -> Result<()> {
        let delivered = self.permitted && self.notifier.notify(title, body);
        if self.history.len() == HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(Notification {
            title: title.to_string(),
            body: body.to_string(),
            at,
            delivered,
        });

        if delivered {
            return Ok(());
        }
        let reason = if self.permitted {
            "delivery failed"
        } else {
            "permission not granted"
        };
        warn!(%title, reason, "notification not delivered");
        Err(CoreError::NotifierUnavailable(reason.to_string()))
    }
}
