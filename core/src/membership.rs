//! Join/leave membership management.
//!
//! The membership manager is the only writer of the `players` list and
//! the sole source of the `Waiting` ↔ `Full` edges. Every mutation is a
//! read-validate-write: preconditions are rechecked against the freshest
//! record immediately before the conditional write, so two joins racing
//! for the last slot resolve to exactly one `Full` transition and one
//! conflict.

use crate::clock::Clock;
use crate::error::CoreError;
use crate::lifecycle::engine::{status_after_join, status_after_leave};
use crate::notify::{NotificationKind, Notifier};
use crate::store::{EventRepository, MAX_WRITE_ATTEMPTS, StoreError};
use crate::types::{Event, EventId, EventStatus, UserId};
use crate::users::{UserDirectory, UserRecord};
use std::sync::Arc;
use tracing::{info, warn};

/// Join/leave operations over event rosters.
pub struct MembershipManager {
    repository: Arc<dyn EventRepository>,
    users: Arc<dyn UserDirectory>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

fn event_url(event_id: EventId) -> String {
    format!("/api/events/{event_id}")
}

/// Preconditions for joining, checked against the freshest record.
fn validate_join(event: &Event, user_id: UserId) -> Result<(), CoreError> {
    if !event.status.accepts_players() {
        return Err(CoreError::conflict(format!(
            "event {} is not accepting players (status {})",
            event.id, event.status
        )));
    }
    if event.is_player(user_id) {
        return Err(CoreError::conflict(format!(
            "user {user_id} already joined event {}",
            event.id
        )));
    }
    Ok(())
}

/// Preconditions for leaving, checked against the freshest record.
fn validate_leave(event: &Event, user_id: UserId) -> Result<(), CoreError> {
    if !event.status.in_capacity_phase() {
        return Err(CoreError::conflict(format!(
            "players cannot leave event {} in status {}",
            event.id, event.status
        )));
    }
    if !event.is_player(user_id) {
        return Err(CoreError::not_found("player", user_id));
    }
    Ok(())
}

impl MembershipManager {
    /// Creates a membership manager.
    #[must_use]
    pub fn new(
        repository: Arc<dyn EventRepository>,
        users: Arc<dyn UserDirectory>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            users,
            notifier,
            clock,
        }
    }

    /// Add `user_id` to the event's roster.
    ///
    /// Existing players are notified of the join; when the join fills the
    /// last slot the event flips to `Full` in the same write and every
    /// player is notified. Returns the joined user's record.
    ///
    /// # Errors
    ///
    /// - [`CoreError::NotFound`]: unknown user or event
    /// - [`CoreError::Conflict`]: event not accepting players, or the
    ///   user already joined
    /// - [`CoreError::Storage`]: repository failure or persistent
    ///   write contention
    pub async fn join(&self, user_id: UserId, event_id: EventId) -> Result<UserRecord, CoreError> {
        let user = self
            .users
            .find(user_id)
            .await?
            .ok_or_else(|| CoreError::not_found("user", user_id))?;

        for _ in 0..MAX_WRITE_ATTEMPTS {
            let current = self
                .repository
                .get(event_id)
                .await
                .map_err(|e| CoreError::Storage(e.to_string()))?
                .ok_or_else(|| CoreError::not_found("event", event_id))?;

            validate_join(&current.event, user_id)?;

            let mut event = current.event;
            let joined_players = event.players.clone();
            event.players.push(user_id);
            event.status = status_after_join(&event);
            event.updated_at = self.clock.now();
            let filled = event.status == EventStatus::Full;

            match self
                .repository
                .update(event_id, current.version, event.clone())
                .await
            {
                Ok(_) => {
                    let url = event_url(event_id);
                    for player in &joined_players {
                        self.notifier.notify(*player, NotificationKind::JoinEvent, &url);
                    }
                    if filled {
                        for player in &event.players {
                            self.notifier.notify(*player, NotificationKind::EventFull, &url);
                        }
                        metrics::counter!(
                            "pickup_status_transitions_total",
                            "from" => EventStatus::Waiting.as_str(),
                            "to" => EventStatus::Full.as_str()
                        )
                        .increment(1);
                    }
                    metrics::counter!("pickup_event_joins_total").increment(1);
                    info!(
                        event_id = %event_id,
                        user_id = %user_id,
                        players = event.player_count(),
                        filled,
                        "player joined event"
                    );
                    return Ok(user);
                }
                Err(StoreError::VersionConflict { .. }) => continue,
                Err(StoreError::NotFound(_)) => {
                    return Err(CoreError::not_found("event", event_id));
                }
                Err(e) => return Err(CoreError::Storage(e.to_string())),
            }
        }

        warn!(event_id = %event_id, user_id = %user_id, "join gave up under write contention");
        Err(CoreError::Storage(format!(
            "gave up joining event {event_id} after {MAX_WRITE_ATTEMPTS} attempts"
        )))
    }

    /// Remove `user_id` from the event's roster.
    ///
    /// Leaving a `Full` event frees a slot and flips the status back to
    /// `Waiting` in the same write.
    ///
    /// # Errors
    ///
    /// - [`CoreError::NotFound`]: unknown user or event, or the user is
    ///   not a player of this event
    /// - [`CoreError::Conflict`]: event no longer in the
    ///   `Waiting`/`Full` phase
    /// - [`CoreError::Storage`]: repository failure or persistent
    ///   write contention
    pub async fn leave(&self, user_id: UserId, event_id: EventId) -> Result<(), CoreError> {
        self.users
            .find(user_id)
            .await?
            .ok_or_else(|| CoreError::not_found("user", user_id))?;

        for _ in 0..MAX_WRITE_ATTEMPTS {
            let current = self
                .repository
                .get(event_id)
                .await
                .map_err(|e| CoreError::Storage(e.to_string()))?
                .ok_or_else(|| CoreError::not_found("event", event_id))?;

            validate_leave(&current.event, user_id)?;

            let mut event = current.event;
            let previous = event.status;
            event.players.retain(|p| *p != user_id);
            event.status = status_after_leave(previous, &event);
            event.updated_at = self.clock.now();
            let reopened = previous == EventStatus::Full && event.status == EventStatus::Waiting;

            match self
                .repository
                .update(event_id, current.version, event.clone())
                .await
            {
                Ok(_) => {
                    if reopened {
                        metrics::counter!(
                            "pickup_status_transitions_total",
                            "from" => EventStatus::Full.as_str(),
                            "to" => EventStatus::Waiting.as_str()
                        )
                        .increment(1);
                    }
                    metrics::counter!("pickup_event_leaves_total").increment(1);
                    info!(
                        event_id = %event_id,
                        user_id = %user_id,
                        players = event.player_count(),
                        reopened,
                        "player left event"
                    );
                    return Ok(());
                }
                Err(StoreError::VersionConflict { .. }) => continue,
                Err(StoreError::NotFound(_)) => {
                    return Err(CoreError::not_found("event", event_id));
                }
                Err(e) => return Err(CoreError::Storage(e.to_string())),
            }
        }

        warn!(event_id = %event_id, user_id = %user_id, "leave gave up under write contention");
        Err(CoreError::Storage(format!(
            "gave up leaving event {event_id} after {MAX_WRITE_ATTEMPTS} attempts"
        )))
    }

    /// Full player records for an event, in join order.
    ///
    /// # Errors
    ///
    /// - [`CoreError::NotFound`]: unknown event
    /// - [`CoreError::Storage`]: repository failure
    pub async fn list_players(&self, event_id: EventId) -> Result<Vec<UserRecord>, CoreError> {
        let current = self
            .repository
            .get(event_id)
            .await
            .map_err(|e| CoreError::Storage(e.to_string()))?
            .ok_or_else(|| CoreError::not_found("event", event_id))?;

        let mut records = Vec::with_capacity(current.event.players.len());
        for player in current.event.players {
            match self.users.find(player).await? {
                Some(record) => records.push(record),
                // The directory is an external collaborator; a dangling
                // player id is its inconsistency to surface, not ours.
                None => warn!(user_id = %player, event_id = %event_id, "player missing from directory; omitting"),
            }
        }
        Ok(records)
    }
}
