use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::trace;

use crate::app::NotificationConfig;

/// Flavor of a transient notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Error,
    Success,
}

/// Where a notification is in its countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticePhase {
    Active,
    FadingOut,
    Cleared,
}

/// An ephemeral status message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransientNotification {
    pub text: String,
    pub kind: NoticeKind,
    pub phase: NoticePhase,
    /// Increases with every notification shown by the same timer
    pub serial: u64,
}

impl TransientNotification {
    pub fn is_visible(&self) -> bool {
        self.phase != NoticePhase::Cleared
    }
}

/// Two-stage countdown: Active, then FadingOut for the last `fade`, then Cleared
///
/// Showing a new notification aborts the countdown of the previous one, so a
/// stale clear can never wipe a newer message.
pub struct NotificationTimer {
    duration: Duration,
    fade: Duration,
    current: Arc<watch::Sender<Option<TransientNotification>>>,
    pending: Mutex<Pending>,
}

#[derive(Default)]
struct Pending {
    serial: u64,
    task: Option<JoinHandle<()>>,
}

impl NotificationTimer {
    pub fn new(duration: Duration, fade: Duration) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            duration,
            fade: fade.min(duration),
            current: Arc::new(tx),
            pending: Mutex::new(Pending::default()),
        }
    }

    pub fn from_config(config: &NotificationConfig) -> Self {
        Self::new(config.duration(), config.fade())
    }

    /// Show a notification, superseding whatever is showing now. Needs a tokio runtime.
    pub fn show(&self, text: impl Into<String>, kind: NoticeKind) -> u64 {
        let mut pending = self.pending.lock();
        if let Some(task) = pending.task.take() {
            task.abort();
        }
        pending.serial += 1;
        let serial = pending.serial;

        self.current.send_replace(Some(TransientNotification {
            text: text.into(),
            kind,
            phase: NoticePhase::Active,
            serial,
        }));

        let current = Arc::clone(&self.current);
        let active_for = self.duration - self.fade;
        let fade = self.fade;
        pending.task = Some(tokio::spawn(async move {
            tokio::time::sleep(active_for).await;
            advance(&current, serial, NoticePhase::FadingOut);
            tokio::time::sleep(fade).await;
            advance(&current, serial, NoticePhase::Cleared);
        }));

        serial
    }

    /// Cancel the countdown and clear immediately
    pub fn dismiss(&self) {
        let mut pending = self.pending.lock();
        if let Some(task) = pending.task.take() {
            task.abort();
        }
        let serial = pending.serial;
        advance(&self.current, serial, NoticePhase::Cleared);
    }

    pub fn current(&self) -> Option<TransientNotification> {
        self.current.borrow().clone()
    }

    /// Receiver that wakes on every phase change
    pub fn subscribe(&self) -> watch::Receiver<Option<TransientNotification>> {
        self.current.subscribe()
    }
}

impl Drop for NotificationTimer {
    fn drop(&mut self) {
        if let Some(task) = self.pending.get_mut().task.take() {
            task.abort();
        }
    }
}

/// Move the notification to `phase`, but only if it is still the one numbered `serial`
fn advance(
    current: &watch::Sender<Option<TransientNotification>>,
    serial: u64,
    phase: NoticePhase,
) {
    current.send_if_modified(|slot| match slot {
        Some(notice) if notice.serial == serial && notice.phase != phase => {
            trace!(serial, ?phase, "notification phase change");
            notice.phase = phase;
            true
        }
        _ => false,
    });
}
