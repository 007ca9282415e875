//! # Pickup Core
//!
//! Domain core for the Pickup sports-meetup coordination backend.
//!
//! Users create scheduled sporting events, other players join and leave
//! while the event is open, and a set of time-fired triggers walks every
//! event through its lifecycle. The crate is organised around four
//! components:
//!
//! ```text
//!                 join / leave                    fired triggers
//!                      │                                │
//!                      ▼                                ▼
//!            ┌──────────────────┐             ┌──────────────────┐
//!            │    Membership    │             │    Lifecycle     │
//!            │     Manager      │             │     Engine       │
//!            └──────────────────┘             └──────────────────┘
//!                      │    versioned read-modify-write │
//!                      └───────────────┬────────────────┘
//!                                      ▼
//!                           ┌──────────────────┐
//!                           │ Event repository │   (single source of truth)
//!                           └──────────────────┘
//!                                      ▲
//!                                      │ create / update / remove
//!                           ┌──────────────────┐
//!                           │  Event service   │──▶ Trigger scheduler
//!                           └──────────────────┘
//! ```
//!
//! - [`events::EventService`]: creation, queries and the guarded
//!   update/remove mutations of event records.
//! - [`membership::MembershipManager`]: join/leave with capacity
//!   invariants; the sole source of the `Waiting` ↔ `Full` edges.
//! - [`lifecycle`]: the status transition table, the engine that applies
//!   fired triggers, and the scheduling port with its Tokio
//!   implementation.
//! - [`store`]: the repository port. Every record carries a version and
//!   all mutations are conditional on it, so two joins racing for the
//!   last slot (or a leave racing a confirm check) can never produce a
//!   lost update.
//!
//! Side effects that are not the record write itself — notifications,
//! real-time signals — go through the fire-and-forget [`notify`] queue
//! and never block or roll back a membership write.

pub mod clock;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod membership;
pub mod notify;
pub mod store;
pub mod types;
pub mod users;

pub use clock::{Clock, SystemClock};
pub use error::CoreError;
pub use events::{EventFilter, EventPage, EventService, EventUpdate, NewEvent, Proximity};
pub use lifecycle::engine::{LifecycleEngine, TriggerHandler, transition_for_trigger};
pub use lifecycle::scheduler::{
    ScheduledTrigger, TokioTriggerScheduler, TriggerKind, TriggerScheduler,
};
pub use membership::MembershipManager;
pub use notify::{Notification, NotificationKind, NotificationSink, Notifier, QueuedNotifier};
pub use store::{EventRepository, StoreError, memory::InMemoryEventRepository};
pub use types::{
    CurrencyCode, Event, EventId, EventStatus, GeoPoint, Intensity, Money, SportId, UserId,
    Version, VersionedEvent,
};
pub use users::{InMemoryUserDirectory, UserDirectory, UserRecord};
