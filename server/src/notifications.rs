//! Stored notifications and the best-effort realtime signal.
//!
//! The collaborator side of the core's notification contract: delivered
//! notifications land in a per-user inbox (queryable over HTTP as the
//! polling fallback) and a broadcast signal tells connected websocket
//! clients that something new exists for a user. The signal carries no
//! payload and no delivery guarantee; clients re-query the inbox.

use async_trait::async_trait;
use pickup_core::notify::{Notification, NotificationSink};
use pickup_core::{CoreError, UserId};
use std::collections::HashMap;
use tokio::sync::{RwLock, broadcast};

/// Capacity of the realtime signal channel; slow subscribers miss
/// signals rather than applying backpressure.
const SIGNAL_CAPACITY: usize = 256;

/// In-memory notification inbox with a realtime signal.
pub struct NotificationStore {
    inbox: RwLock<HashMap<UserId, Vec<Notification>>>,
    signal: broadcast::Sender<UserId>,
}

impl NotificationStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        let (signal, _) = broadcast::channel(SIGNAL_CAPACITY);
        Self {
            inbox: RwLock::new(HashMap::new()),
            signal,
        }
    }

    /// All notifications delivered to `user_id`, oldest first.
    pub async fn for_user(&self, user_id: UserId) -> Vec<Notification> {
        self.inbox
            .read()
            .await
            .get(&user_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Subscribe to the "new notification for user X" signal.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<UserId> {
        self.signal.subscribe()
    }
}

impl Default for NotificationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationSink for NotificationStore {
    async fn deliver(&self, notification: Notification) -> Result<(), CoreError> {
        let user_id = notification.user_id;
        self.inbox
            .write()
            .await
            .entry(user_id)
            .or_default()
            .push(notification);
        // No connected clients is not a failure; the inbox query is the
        // fallback.
        let _ = self.signal.send(user_id);
        Ok(())
    }
}
