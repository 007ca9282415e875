//! Notification endpoints.
//!
//! - `GET /api/users/:id/notifications` - Stored notifications for a
//!   user (requires auth; the polling fallback)
//! - `GET /api/ws/notifications` - Best-effort websocket signal that new
//!   notifications exist for the authenticated user
//!
//! The websocket pushes no payload, only a nudge:
//!
//! ```json
//! {"type": "notifications_available"}
//! ```
//!
//! Clients react by re-querying the stored notifications; a missed
//! signal is recovered by the next poll.

use crate::error::ApiError;
use crate::extract::AuthenticatedUser;
use crate::state::AppState;
use axum::{
    Json,
    extract::{
        Path, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use chrono::{DateTime, Utc};
use pickup_core::notify::Notification;
use pickup_core::{NotificationKind, UserId};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{Duration, interval};
use tracing::debug;
use uuid::Uuid;

/// Ping interval for websocket keep-alive.
const PING_INTERVAL_SECS: u64 = 30;

/// A stored notification as returned by the API.
#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    /// What happened
    pub kind: NotificationKind,
    /// Where to look it up
    pub context_url: String,
    /// When it was produced
    pub created_at: DateTime<Utc>,
}

impl From<&Notification> for NotificationResponse {
    fn from(notification: &Notification) -> Self {
        Self {
            kind: notification.kind,
            context_url: notification.context_url.clone(),
            created_at: notification.created_at,
        }
    }
}

/// Success envelope for a notification listing.
#[derive(Debug, Serialize)]
pub struct NotificationsResponse {
    /// Stored notifications, oldest first
    pub notifications: Vec<NotificationResponse>,
}

/// List the stored notifications of the authenticated user.
pub async fn list_notifications(
    AuthenticatedUser(requester): AuthenticatedUser,
    Path(user_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<NotificationsResponse>, ApiError> {
    let user_id = UserId::from_uuid(user_id);
    if requester != user_id {
        return Err(ApiError::forbidden(
            "notifications can only be read by their owner",
        ));
    }

    let notifications = state.notifications.for_user(user_id).await;
    Ok(Json(NotificationsResponse {
        notifications: notifications.iter().map(NotificationResponse::from).collect(),
    }))
}

/// Upgrade to a websocket that signals new notifications for the
/// authenticated user.
pub async fn notifications_ws(
    AuthenticatedUser(user_id): AuthenticatedUser,
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Response {
    let notifications = Arc::clone(&state.notifications);
    ws.on_upgrade(move |socket| forward_signals(socket, user_id, notifications))
}

async fn forward_signals(
    mut socket: WebSocket,
    user_id: UserId,
    notifications: Arc<crate::notifications::NotificationStore>,
) {
    let mut signal = notifications.subscribe();
    let mut ping = interval(Duration::from_secs(PING_INTERVAL_SECS));
    debug!(user_id = %user_id, "notification websocket connected");

    loop {
        tokio::select! {
            received = signal.recv() => match received {
                Ok(id) if id == user_id => {
                    let nudge = "{\"type\":\"notifications_available\"}".to_string();
                    if socket.send(Message::Text(nudge)).await.is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                // Missed signals are fine: the client polls the inbox.
                Err(RecvError::Lagged(skipped)) => {
                    debug!(user_id = %user_id, skipped, "notification signal lagged");
                }
                Err(RecvError::Closed) => break,
            },
            _ = ping.tick() => {
                if socket.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => match incoming {
                Some(Ok(_)) => {}
                Some(Err(_)) | None => break,
            },
        }
    }

    debug!(user_id = %user_id, "notification websocket closed");
}
