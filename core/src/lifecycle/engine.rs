//! Status transition engine.
//!
//! The transition table is a pure function of the current status, so the
//! engine is idempotent under duplicate trigger delivery: a second
//! `CONFIRM_CHECK` for an already-confirmed event resolves to no
//! transition. Applying a transition is a conditional write against the
//! record's version; losing the race means re-reading and re-resolving.

use crate::clock::Clock;
use crate::error::CoreError;
use crate::lifecycle::scheduler::{ScheduledTrigger, TriggerKind};
use crate::notify::{NotificationKind, Notifier};
use crate::store::{EventRepository, MAX_WRITE_ATTEMPTS, StoreError};
use crate::types::{Event, EventStatus};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Resolve a fired trigger against the current status.
///
/// `None` means the trigger has nothing left to do — it was re-delivered,
/// arrived after a terminal transition, or the status moved past it.
#[must_use]
pub const fn transition_for_trigger(
    status: EventStatus,
    kind: TriggerKind,
) -> Option<EventStatus> {
    match kind {
        // The cutoff disambiguates "will enough players show up" from the
        // start time itself: a waiting event never filled up and is
        // canceled, a full one is locked in.
        TriggerKind::ConfirmCheck => match status {
            EventStatus::Waiting => Some(EventStatus::Canceled),
            EventStatus::Full => Some(EventStatus::Confirmed),
            EventStatus::Confirmed
            | EventStatus::Canceled
            | EventStatus::Disputing
            | EventStatus::Finished => None,
        },
        // Any non-canceled pre-start status moves to the dispute window
        // once the start time is reached.
        TriggerKind::Start => match status {
            EventStatus::Waiting | EventStatus::Full | EventStatus::Confirmed => {
                Some(EventStatus::Disputing)
            }
            EventStatus::Canceled | EventStatus::Disputing | EventStatus::Finished => None,
        },
        TriggerKind::Finish => match status {
            EventStatus::Disputing => Some(EventStatus::Finished),
            EventStatus::Waiting
            | EventStatus::Full
            | EventStatus::Confirmed
            | EventStatus::Canceled
            | EventStatus::Finished => None,
        },
    }
}

/// Status after a player was appended to the roster.
#[must_use]
pub fn status_after_join(event: &Event) -> EventStatus {
    if event.at_capacity() {
        EventStatus::Full
    } else {
        EventStatus::Waiting
    }
}

/// Status after a player left, given the status before the removal.
#[must_use]
pub fn status_after_leave(previous: EventStatus, event: &Event) -> EventStatus {
    if previous == EventStatus::Full && event.player_count() == event.max_players as usize - 1 {
        EventStatus::Waiting
    } else {
        previous
    }
}

/// Applies fired triggers to stored event records.
pub struct LifecycleEngine {
    repository: Arc<dyn EventRepository>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl LifecycleEngine {
    /// Creates an engine writing through `repository`.
    #[must_use]
    pub fn new(
        repository: Arc<dyn EventRepository>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            notifier,
            clock,
        }
    }

    fn notify_players(&self, event: &Event, kind: NotificationKind) {
        let url = format!("/api/events/{}", event.id);
        for player in &event.players {
            self.notifier.notify(*player, kind, &url);
        }
    }
}

/// Receiver side of the scheduling port: called when a trigger fires.
#[async_trait]
pub trait TriggerHandler: Send + Sync {
    /// Apply one fired trigger.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Storage`] when the repository fails or the
    /// conditional write keeps losing. A missing event is *not* an error:
    /// the trigger outlived its target and is dropped.
    async fn handle(&self, trigger: ScheduledTrigger) -> Result<(), CoreError>;
}

#[async_trait]
impl TriggerHandler for LifecycleEngine {
    async fn handle(&self, trigger: ScheduledTrigger) -> Result<(), CoreError> {
        for _ in 0..MAX_WRITE_ATTEMPTS {
            let current = self
                .repository
                .get(trigger.event_id)
                .await
                .map_err(|e| CoreError::Storage(e.to_string()))?;

            let Some(current) = current else {
                debug!(
                    event_id = %trigger.event_id,
                    kind = trigger.kind.as_str(),
                    "event gone before trigger fired; dropping"
                );
                return Ok(());
            };

            let from = current.event.status;
            let Some(to) = transition_for_trigger(from, trigger.kind) else {
                debug!(
                    event_id = %trigger.event_id,
                    kind = trigger.kind.as_str(),
                    status = from.as_str(),
                    "trigger resolved to no transition"
                );
                return Ok(());
            };

            let mut event = current.event;
            event.status = to;
            event.updated_at = self.clock.now();

            match self
                .repository
                .update(trigger.event_id, current.version, event.clone())
                .await
            {
                Ok(_) => {
                    info!(
                        event_id = %trigger.event_id,
                        kind = trigger.kind.as_str(),
                        from = from.as_str(),
                        to = to.as_str(),
                        "applied lifecycle transition"
                    );
                    metrics::counter!(
                        "pickup_status_transitions_total",
                        "from" => from.as_str(),
                        "to" => to.as_str()
                    )
                    .increment(1);
                    match to {
                        EventStatus::Confirmed => {
                            self.notify_players(&event, NotificationKind::EventConfirmed);
                        }
                        EventStatus::Canceled => {
                            self.notify_players(&event, NotificationKind::EventCanceled);
                        }
                        EventStatus::Waiting
                        | EventStatus::Full
                        | EventStatus::Disputing
                        | EventStatus::Finished => {}
                    }
                    return Ok(());
                }
                // Lost a race against a join/leave or another trigger:
                // re-read and re-resolve against the fresh status.
                Err(StoreError::VersionConflict { .. }) => continue,
                Err(StoreError::NotFound(_)) => {
                    debug!(
                        event_id = %trigger.event_id,
                        kind = trigger.kind.as_str(),
                        "event removed mid-trigger; dropping"
                    );
                    return Ok(());
                }
                Err(e) => return Err(CoreError::Storage(e.to_string())),
            }
        }
        Err(CoreError::Storage(format!(
            "gave up applying {} to event {} after {MAX_WRITE_ATTEMPTS} attempts",
            trigger.kind.as_str(),
            trigger.event_id
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirm_check_cancels_waiting() {
        assert_eq!(
            transition_for_trigger(EventStatus::Waiting, TriggerKind::ConfirmCheck),
            Some(EventStatus::Canceled)
        );
    }

    #[test]
    fn confirm_check_confirms_full() {
        assert_eq!(
            transition_for_trigger(EventStatus::Full, TriggerKind::ConfirmCheck),
            Some(EventStatus::Confirmed)
        );
    }

    #[test]
    fn confirm_check_is_idempotent_after_resolution() {
        for resolved in [
            EventStatus::Confirmed,
            EventStatus::Canceled,
            EventStatus::Disputing,
            EventStatus::Finished,
        ] {
            assert_eq!(
                transition_for_trigger(resolved, TriggerKind::ConfirmCheck),
                None
            );
        }
    }

    #[test]
    fn start_moves_pre_start_statuses_to_disputing() {
        for pre_start in [EventStatus::Waiting, EventStatus::Full, EventStatus::Confirmed] {
            assert_eq!(
                transition_for_trigger(pre_start, TriggerKind::Start),
                Some(EventStatus::Disputing)
            );
        }
    }

    #[test]
    fn start_is_a_noop_once_canceled_or_past() {
        for status in [
            EventStatus::Canceled,
            EventStatus::Disputing,
            EventStatus::Finished,
        ] {
            assert_eq!(transition_for_trigger(status, TriggerKind::Start), None);
        }
    }

    #[test]
    fn finish_only_closes_disputing() {
        assert_eq!(
            transition_for_trigger(EventStatus::Disputing, TriggerKind::Finish),
            Some(EventStatus::Finished)
        );
        for status in [
            EventStatus::Waiting,
            EventStatus::Full,
            EventStatus::Confirmed,
            EventStatus::Canceled,
            EventStatus::Finished,
        ] {
            assert_eq!(transition_for_trigger(status, TriggerKind::Finish), None);
        }
    }

    #[test]
    fn terminal_statuses_absorb_every_trigger() {
        for status in [EventStatus::Canceled, EventStatus::Finished] {
            for kind in [
                TriggerKind::ConfirmCheck,
                TriggerKind::Start,
                TriggerKind::Finish,
            ] {
                assert_eq!(transition_for_trigger(status, kind), None);
            }
        }
    }
}
