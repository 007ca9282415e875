//! Outbound notifications.
//!
//! Membership and lifecycle changes notify affected players, but delivery
//! is never part of the record write: [`Notifier::notify`] only enqueues
//! onto an unbounded channel and returns immediately. A background
//! dispatcher drains the queue into a [`NotificationSink`]; a failed
//! delivery is logged and dropped, it cannot block or roll back the
//! mutation that produced it.

use crate::clock::Clock;
use crate::error::CoreError;
use crate::types::UserId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

/// What a notification is about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    /// Someone joined an event you are in
    JoinEvent,
    /// An event you are in reached capacity
    EventFull,
    /// An event you are in was confirmed at the pre-start cutoff
    EventConfirmed,
    /// An event you are in was canceled at the pre-start cutoff
    EventCanceled,
}

impl NotificationKind {
    /// Stable name, usable as a metrics label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::JoinEvent => "JOIN_EVENT",
            Self::EventFull => "EVENT_FULL",
            Self::EventConfirmed => "EVENT_CONFIRMED",
            Self::EventCanceled => "EVENT_CANCELED",
        }
    }
}

/// A single outbound notification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Recipient
    pub user_id: UserId,
    /// What happened
    pub kind: NotificationKind,
    /// Where the recipient can look it up (e.g. `/api/events/<id>`)
    pub context_url: String,
    /// When the notification was produced
    pub created_at: DateTime<Utc>,
}

/// Fire-and-forget notification emission.
pub trait Notifier: Send + Sync {
    /// Enqueue a notification for `user_id`. Must not block and must not
    /// fail the caller; senders cannot observe delivery.
    fn notify(&self, user_id: UserId, kind: NotificationKind, context_url: &str);
}

/// Delivery target for the dispatcher (stored inbox, push gateway, ...).
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver one notification.
    ///
    /// # Errors
    ///
    /// Returns an error when delivery failed; the dispatcher logs and
    /// drops it.
    async fn deliver(&self, notification: Notification) -> Result<(), CoreError>;
}

/// [`Notifier`] backed by an unbounded queue and a background dispatcher.
pub struct QueuedNotifier {
    tx: mpsc::UnboundedSender<Notification>,
    clock: Arc<dyn Clock>,
}

impl QueuedNotifier {
    /// Creates the notifier and spawns its dispatcher task.
    #[must_use]
    pub fn spawn(sink: Arc<dyn NotificationSink>, clock: Arc<dyn Clock>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(dispatch(rx, sink));
        Self { tx, clock }
    }
}

impl Notifier for QueuedNotifier {
    fn notify(&self, user_id: UserId, kind: NotificationKind, context_url: &str) {
        let notification = Notification {
            user_id,
            kind,
            context_url: context_url.to_string(),
            created_at: self.clock.now(),
        };
        metrics::counter!("pickup_notifications_enqueued_total", "kind" => kind.as_str())
            .increment(1);
        if self.tx.send(notification).is_err() {
            warn!(user_id = %user_id, kind = kind.as_str(), "notification dispatcher stopped; dropping");
        }
    }
}

async fn dispatch(mut rx: mpsc::UnboundedReceiver<Notification>, sink: Arc<dyn NotificationSink>) {
    while let Some(notification) = rx.recv().await {
        let user_id = notification.user_id;
        let kind = notification.kind;
        if let Err(error) = sink.deliver(notification).await {
            warn!(
                user_id = %user_id,
                kind = kind.as_str(),
                %error,
                "dropping undeliverable notification"
            );
        }
    }
}
