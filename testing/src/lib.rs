//! # Pickup Testing
//!
//! Deterministic implementations of the core's ports, for tests:
//!
//! - [`FixedClock`]: always returns the same instant, so validation
//!   against "now" and stored timestamps are reproducible.
//! - [`CapturingNotifier`]: records every notification instead of
//!   delivering it.
//! - [`ManualTriggerScheduler`]: records scheduled triggers and lets the
//!   test decide when (and whether) they fire, by handing them to a
//!   [`pickup_core::TriggerHandler`] itself.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pickup_core::lifecycle::scheduler::{ScheduledTrigger, TriggerScheduler};
use pickup_core::notify::{Notification, NotificationKind, Notifier};
use pickup_core::{Clock, EventId, UserId};
use std::sync::Mutex;

/// Fixed instant used as "now" across the test suites
/// (2025-06-01 12:00:00 UTC).
///
/// # Panics
///
/// Panics if the hardcoded timestamp fails to parse, which cannot happen.
#[must_use]
#[allow(clippy::expect_used)]
pub fn test_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-06-01T12:00:00Z")
        .expect("hardcoded timestamp should always parse")
        .with_timezone(&Utc)
}

/// Fixed clock for deterministic tests: always returns the same time.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    time: DateTime<Utc>,
}

impl FixedClock {
    /// Creates a clock pinned to `time`.
    #[must_use]
    pub const fn new(time: DateTime<Utc>) -> Self {
        Self { time }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.time
    }
}

/// Notifier that records instead of delivering.
#[derive(Debug, Default)]
pub struct CapturingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl CapturingNotifier {
    /// Creates an empty capturing notifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything notified so far, in emission order.
    ///
    /// # Panics
    ///
    /// Panics if a previous holder of the lock panicked.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    /// Drops everything recorded so far.
    ///
    /// # Panics
    ///
    /// Panics if a previous holder of the lock panicked.
    #[allow(clippy::unwrap_used)]
    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

impl Notifier for CapturingNotifier {
    #[allow(clippy::unwrap_used)]
    fn notify(&self, user_id: UserId, kind: NotificationKind, context_url: &str) {
        self.sent.lock().unwrap().push(Notification {
            user_id,
            kind,
            context_url: context_url.to_string(),
            created_at: test_time(),
        });
    }
}

/// Scheduler that records triggers instead of arming timers.
///
/// Tests drain [`ManualTriggerScheduler::pending`] and feed the triggers
/// to the engine themselves, in whatever order and multiplicity the
/// scenario calls for.
#[derive(Debug, Default)]
pub struct ManualTriggerScheduler {
    pending: Mutex<Vec<ScheduledTrigger>>,
    canceled: Mutex<Vec<EventId>>,
}

impl ManualTriggerScheduler {
    /// Creates an empty manual scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Triggers scheduled and not yet canceled, in scheduling order.
    ///
    /// # Panics
    ///
    /// Panics if a previous holder of the lock panicked.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn pending(&self) -> Vec<ScheduledTrigger> {
        self.pending.lock().unwrap().clone()
    }

    /// Event ids whose triggers were canceled, in cancellation order.
    ///
    /// # Panics
    ///
    /// Panics if a previous holder of the lock panicked.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn canceled_events(&self) -> Vec<EventId> {
        self.canceled.lock().unwrap().clone()
    }
}

#[async_trait]
impl TriggerScheduler for ManualTriggerScheduler {
    #[allow(clippy::unwrap_used)]
    async fn schedule(&self, trigger: ScheduledTrigger) {
        self.pending.lock().unwrap().push(trigger);
    }

    #[allow(clippy::unwrap_used)]
    async fn cancel_for_event(&self, event_id: EventId) {
        self.pending
            .lock()
            .unwrap()
            .retain(|t| t.event_id != event_id);
        self.canceled.lock().unwrap().push(event_id);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pickup_core::TriggerKind;

    #[test]
    fn fixed_clock_is_fixed() {
        let clock = FixedClock::new(test_time());
        assert_eq!(clock.now(), clock.now());
    }

    #[tokio::test]
    async fn manual_scheduler_records_and_cancels() {
        let scheduler = ManualTriggerScheduler::new();
        let event_id = EventId::new();
        scheduler
            .schedule(ScheduledTrigger {
                kind: TriggerKind::Start,
                event_id,
                fire_at: test_time(),
            })
            .await;
        assert_eq!(scheduler.pending().len(), 1);

        scheduler.cancel_for_event(event_id).await;
        assert!(scheduler.pending().is_empty());
        assert_eq!(scheduler.canceled_events(), vec![event_id]);
    }
}
