//! Trigger scheduling port and its Tokio implementation.
//!
//! The scheduler translates an event's start/end times into deferred
//! invocations of the transition engine. It is injected as a port so the
//! core never touches a global timer registry; tests swap in a manual
//! implementation and fire triggers by hand.

use crate::clock::Clock;
use crate::lifecycle::engine::TriggerHandler;
use crate::types::{Event, EventId};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Minutes before the start time at which the confirm check fires.
///
/// The gap gives hosts and players a window to back out before the
/// roster is locked in as `Confirmed`.
pub const CONFIRM_CHECK_LEAD_MINUTES: i64 = 30;

/// Which lifecycle edge a trigger drives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerKind {
    /// Pre-start cutoff: cancel a waiting event, confirm a full one
    ConfirmCheck,
    /// The event's start time was reached
    Start,
    /// The event's end time was reached
    Finish,
}

impl TriggerKind {
    /// Stable name, usable as a metrics label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ConfirmCheck => "CONFIRM_CHECK",
            Self::Start => "START",
            Self::Finish => "FINISH",
        }
    }
}

/// A scheduled, time-fired invocation of the transition engine for one
/// event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledTrigger {
    /// Which edge to drive
    pub kind: TriggerKind,
    /// Target event
    pub event_id: EventId,
    /// Absolute fire time
    pub fire_at: DateTime<Utc>,
}

impl ScheduledTrigger {
    /// The three triggers registered for a freshly created event, in
    /// chronological order: confirm check ≤ start ≤ finish.
    #[must_use]
    pub fn for_event(event: &Event) -> [Self; 3] {
        [
            Self {
                kind: TriggerKind::ConfirmCheck,
                event_id: event.id,
                fire_at: event.start_at - Duration::minutes(CONFIRM_CHECK_LEAD_MINUTES),
            },
            Self {
                kind: TriggerKind::Start,
                event_id: event.id,
                fire_at: event.start_at,
            },
            Self {
                kind: TriggerKind::Finish,
                event_id: event.id,
                fire_at: event.end_at,
            },
        ]
    }
}

/// Scheduling port the event service depends on.
#[async_trait]
pub trait TriggerScheduler: Send + Sync {
    /// Register a trigger for future delivery. Best-effort: delivery is
    /// at-least-once within this process, and a trigger that fires after
    /// its event was removed is handled as a no-op downstream.
    async fn schedule(&self, trigger: ScheduledTrigger);

    /// Cancel every pending trigger targeting `event_id`.
    async fn cancel_for_event(&self, event_id: EventId);
}

/// Timer-based scheduler: one sleeping task per pending trigger.
pub struct TokioTriggerScheduler {
    handler: Arc<dyn TriggerHandler>,
    clock: Arc<dyn Clock>,
    tasks: Mutex<HashMap<EventId, Vec<JoinHandle<()>>>>,
}

impl TokioTriggerScheduler {
    /// Creates a scheduler delivering into `handler`.
    #[must_use]
    pub fn new(handler: Arc<dyn TriggerHandler>, clock: Arc<dyn Clock>) -> Self {
        Self {
            handler,
            clock,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Number of events with pending trigger tasks.
    pub async fn pending_events(&self) -> usize {
        self.tasks.lock().await.len()
    }
}

#[async_trait]
impl TriggerScheduler for TokioTriggerScheduler {
    async fn schedule(&self, trigger: ScheduledTrigger) {
        // A fire time already in the past fires immediately.
        let delay = (trigger.fire_at - self.clock.now())
            .to_std()
            .unwrap_or(std::time::Duration::ZERO);

        debug!(
            event_id = %trigger.event_id,
            kind = trigger.kind.as_str(),
            delay_secs = delay.as_secs(),
            "scheduling trigger"
        );

        let handler = Arc::clone(&self.handler);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Delivery failures are logged and dropped, never retried:
            // the target either no longer exists or the transition is no
            // longer meaningful.
            if let Err(error) = handler.handle(trigger).await {
                warn!(
                    event_id = %trigger.event_id,
                    kind = trigger.kind.as_str(),
                    %error,
                    "trigger delivery failed; dropping"
                );
            }
        });

        let mut tasks = self.tasks.lock().await;
        // Reap entries whose triggers have all fired, so long-gone events
        // do not accumulate finished handles.
        tasks.retain(|_, handles| {
            handles.retain(|pending| !pending.is_finished());
            !handles.is_empty()
        });
        tasks.entry(trigger.event_id).or_default().push(handle);
    }

    async fn cancel_for_event(&self, event_id: EventId) {
        if let Some(handles) = self.tasks.lock().await.remove(&event_id) {
            debug!(event_id = %event_id, pending = handles.len(), "canceling triggers");
            for handle in handles {
                handle.abort();
            }
        }
    }
}
