//! Event record façade: creation, queries and the guarded mutations.
//!
//! Creation registers the event's three lifecycle triggers with the
//! scheduler. Update and remove are deliberately narrow: both require the
//! event to still be `Waiting` with nobody but the host on the roster, so
//! no committed player can have the ground pulled out from under them.

use crate::clock::Clock;
use crate::error::CoreError;
use crate::lifecycle::scheduler::{ScheduledTrigger, TriggerScheduler};
use crate::store::{EventRepository, MAX_WRITE_ATTEMPTS, StoreError};
use crate::types::{
    CurrencyCode, Event, EventId, EventStatus, GeoPoint, Intensity, Money, SportId, UserId,
    VersionedEvent,
};
use crate::users::UserDirectory;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;

/// Largest accepted page size for listings.
pub const MAX_PAGE_SIZE: usize = 100;

/// Default page size when the caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Input for creating an event.
#[derive(Clone, Debug)]
pub struct NewEvent {
    /// Event name
    pub name: String,
    /// Free-form description
    pub description: String,
    /// Where the event takes place
    pub location: GeoPoint,
    /// Sport being played
    pub sport: SportId,
    /// When the event starts
    pub start_at: DateTime<Utc>,
    /// When the event ends
    pub end_at: DateTime<Utc>,
    /// Expected intensity
    pub intensity: Intensity,
    /// Maximum number of players
    pub max_players: u32,
    /// Participation fee per player
    pub fee: Money,
    /// Currency of the fee
    pub currency: CurrencyCode,
}

/// Partial update of an event's editable fields.
#[derive(Clone, Debug, Default)]
pub struct EventUpdate {
    /// New name
    pub name: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New location
    pub location: Option<GeoPoint>,
    /// New sport
    pub sport: Option<SportId>,
    /// New start time
    pub start_at: Option<DateTime<Utc>>,
    /// New end time
    pub end_at: Option<DateTime<Utc>>,
    /// New intensity
    pub intensity: Option<Intensity>,
    /// New player cap
    pub max_players: Option<u32>,
    /// New fee
    pub fee: Option<Money>,
    /// New currency
    pub currency: Option<CurrencyCode>,
}

impl EventUpdate {
    /// Whether the patch changes anything at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.location.is_none()
            && self.sport.is_none()
            && self.start_at.is_none()
            && self.end_at.is_none()
            && self.intensity.is_none()
            && self.max_players.is_none()
            && self.fee.is_none()
            && self.currency.is_none()
    }
}

/// Proximity filter: events within `radius_km` of `origin`.
#[derive(Clone, Copy, Debug)]
pub struct Proximity {
    /// Centre of the search
    pub origin: GeoPoint,
    /// Search radius in kilometres
    pub radius_km: f64,
}

/// Listing filter; all criteria are conjunctive.
#[derive(Clone, Debug)]
pub struct EventFilter {
    /// Only events hosted by this user
    pub host: Option<UserId>,
    /// Only events for this sport
    pub sport: Option<SportId>,
    /// Only events in this status
    pub status: Option<EventStatus>,
    /// Only events starting at or after this time
    pub starting_from: Option<DateTime<Utc>>,
    /// Only events starting at or before this time
    pub starting_until: Option<DateTime<Utc>>,
    /// Only events near a point
    pub near: Option<Proximity>,
    /// Zero-indexed page
    pub page: usize,
    /// Page size, clamped to [`MAX_PAGE_SIZE`]
    pub page_size: usize,
}

impl Default for EventFilter {
    fn default() -> Self {
        Self {
            host: None,
            sport: None,
            status: None,
            starting_from: None,
            starting_until: None,
            near: None,
            page: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl EventFilter {
    /// Whether `event` satisfies every criterion (pagination aside).
    #[must_use]
    pub fn matches(&self, event: &Event) -> bool {
        if self.host.is_some_and(|host| event.host != host) {
            return false;
        }
        if self.sport.is_some_and(|sport| event.sport != sport) {
            return false;
        }
        if self.status.is_some_and(|status| event.status != status) {
            return false;
        }
        if self.starting_from.is_some_and(|from| event.start_at < from) {
            return false;
        }
        if self
            .starting_until
            .is_some_and(|until| event.start_at > until)
        {
            return false;
        }
        if let Some(near) = self.near {
            if event.location.distance_km(&near.origin) > near.radius_km {
                return false;
            }
        }
        true
    }
}

/// One page of a listing.
#[derive(Clone, Debug)]
pub struct EventPage {
    /// Events on this page, ordered by start time
    pub events: Vec<Event>,
    /// Total matches across all pages
    pub total: usize,
    /// Zero-indexed page
    pub page: usize,
    /// Effective page size
    pub page_size: usize,
}

/// Façade over the event repository and the trigger scheduler.
pub struct EventService {
    repository: Arc<dyn EventRepository>,
    scheduler: Arc<dyn TriggerScheduler>,
    users: Arc<dyn UserDirectory>,
    clock: Arc<dyn Clock>,
}

fn validate_name(name: &str) -> Result<(), CoreError> {
    if name.trim().is_empty() {
        return Err(CoreError::validation("event name cannot be empty"));
    }
    if name.len() > 200 {
        return Err(CoreError::validation(format!(
            "event name too long: {} characters (max 200)",
            name.len()
        )));
    }
    Ok(())
}

fn validate_schedule(start_at: DateTime<Utc>, end_at: DateTime<Utc>) -> Result<(), CoreError> {
    if end_at <= start_at {
        return Err(CoreError::validation("event must end after it starts"));
    }
    Ok(())
}

fn validate_max_players(max_players: u32) -> Result<(), CoreError> {
    if max_players < 2 {
        return Err(CoreError::validation(format!(
            "max_players must be at least 2, got {max_players}"
        )));
    }
    Ok(())
}

/// Ownership and roster guard shared by update and remove.
fn validate_host_mutation(event: &Event, requester: UserId) -> Result<(), CoreError> {
    if event.host != requester {
        return Err(CoreError::forbidden(format!(
            "only the host may modify event {}",
            event.id
        )));
    }
    if event.status != EventStatus::Waiting || !event.sole_player_is_host() {
        return Err(CoreError::conflict(format!(
            "event {} can only be modified while waiting with no joined players",
            event.id
        )));
    }
    Ok(())
}

impl EventService {
    /// Creates an event service.
    #[must_use]
    pub fn new(
        repository: Arc<dyn EventRepository>,
        scheduler: Arc<dyn TriggerScheduler>,
        users: Arc<dyn UserDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            scheduler,
            users,
            clock,
        }
    }

    /// Create an event hosted by `host` and register its three lifecycle
    /// triggers.
    ///
    /// # Errors
    ///
    /// - [`CoreError::NotFound`]: unknown host
    /// - [`CoreError::Validation`]: empty name, cap below 2, start in the
    ///   past, end before start
    /// - [`CoreError::Storage`]: repository failure
    pub async fn create(
        &self,
        host: UserId,
        new_event: NewEvent,
    ) -> Result<VersionedEvent, CoreError> {
        self.users
            .find(host)
            .await?
            .ok_or_else(|| CoreError::not_found("user", host))?;

        let now = self.clock.now();
        validate_name(&new_event.name)?;
        validate_max_players(new_event.max_players)?;
        validate_schedule(new_event.start_at, new_event.end_at)?;
        if new_event.start_at <= now {
            return Err(CoreError::validation("event must start in the future"));
        }

        let event = Event {
            id: EventId::new(),
            name: new_event.name,
            description: new_event.description,
            location: new_event.location,
            sport: new_event.sport,
            start_at: new_event.start_at,
            end_at: new_event.end_at,
            intensity: new_event.intensity,
            max_players: new_event.max_players,
            fee: new_event.fee,
            currency: new_event.currency,
            status: EventStatus::Waiting,
            host,
            players: vec![host],
            created_at: now,
            updated_at: now,
        };

        let version = self.repository.insert(event.clone()).await.map_err(|e| {
            CoreError::Storage(e.to_string())
        })?;

        for trigger in ScheduledTrigger::for_event(&event) {
            self.scheduler.schedule(trigger).await;
        }

        metrics::counter!("pickup_events_created_total").increment(1);
        info!(event_id = %event.id, host = %host, start_at = %event.start_at, "event created");

        Ok(VersionedEvent { event, version })
    }

    /// Load an event with its version.
    ///
    /// # Errors
    ///
    /// - [`CoreError::NotFound`]: unknown event
    /// - [`CoreError::Storage`]: repository failure
    pub async fn get(&self, event_id: EventId) -> Result<VersionedEvent, CoreError> {
        self.repository
            .get(event_id)
            .await
            .map_err(|e| CoreError::Storage(e.to_string()))?
            .ok_or_else(|| CoreError::not_found("event", event_id))
    }

    /// List events matching `filter`, ordered by start time.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Storage`]: repository failure
    pub async fn list(&self, filter: &EventFilter) -> Result<EventPage, CoreError> {
        let page_size = filter.page_size.clamp(1, MAX_PAGE_SIZE);

        let mut events: Vec<Event> = self
            .repository
            .list()
            .await
            .map_err(|e| CoreError::Storage(e.to_string()))?
            .into_iter()
            .map(|versioned| versioned.event)
            .filter(|event| filter.matches(event))
            .collect();
        events.sort_by_key(|event| event.start_at);

        let total = events.len();
        let events = events
            .into_iter()
            .skip(filter.page.saturating_mul(page_size))
            .take(page_size)
            .collect();

        Ok(EventPage {
            events,
            total,
            page: filter.page,
            page_size,
        })
    }

    /// Apply a partial update to an event.
    ///
    /// Editing the start or end time does **not** reschedule the pending
    /// lifecycle triggers; they keep firing against the times the event
    /// was created with.
    ///
    /// # Errors
    ///
    /// - [`CoreError::NotFound`]: unknown event
    /// - [`CoreError::Forbidden`]: requester is not the host
    /// - [`CoreError::Conflict`]: event no longer `Waiting` with only the
    ///   host on the roster
    /// - [`CoreError::Validation`]: empty patch or invalid resulting
    ///   fields
    /// - [`CoreError::Storage`]: repository failure or persistent write
    ///   contention
    pub async fn update(
        &self,
        event_id: EventId,
        requester: UserId,
        update: EventUpdate,
    ) -> Result<VersionedEvent, CoreError> {
        if update.is_empty() {
            return Err(CoreError::validation("no fields to update"));
        }

        for _ in 0..MAX_WRITE_ATTEMPTS {
            let current = self.get(event_id).await?;
            validate_host_mutation(&current.event, requester)?;

            let mut event = current.event;
            let update = update.clone();
            if let Some(name) = update.name {
                event.name = name;
            }
            if let Some(description) = update.description {
                event.description = description;
            }
            if let Some(location) = update.location {
                event.location = location;
            }
            if let Some(sport) = update.sport {
                event.sport = sport;
            }
            if let Some(start_at) = update.start_at {
                event.start_at = start_at;
            }
            if let Some(end_at) = update.end_at {
                event.end_at = end_at;
            }
            if let Some(intensity) = update.intensity {
                event.intensity = intensity;
            }
            if let Some(max_players) = update.max_players {
                event.max_players = max_players;
            }
            if let Some(fee) = update.fee {
                event.fee = fee;
            }
            if let Some(currency) = update.currency {
                event.currency = currency;
            }

            validate_name(&event.name)?;
            validate_max_players(event.max_players)?;
            validate_schedule(event.start_at, event.end_at)?;
            event.updated_at = self.clock.now();

            match self
                .repository
                .update(event_id, current.version, event.clone())
                .await
            {
                Ok(version) => {
                    info!(event_id = %event_id, "event updated");
                    return Ok(VersionedEvent { event, version });
                }
                Err(StoreError::VersionConflict { .. }) => continue,
                Err(StoreError::NotFound(_)) => {
                    return Err(CoreError::not_found("event", event_id));
                }
                Err(e) => return Err(CoreError::Storage(e.to_string())),
            }
        }

        Err(CoreError::Storage(format!(
            "gave up updating event {event_id} after {MAX_WRITE_ATTEMPTS} attempts"
        )))
    }

    /// Remove an event and cancel its pending triggers.
    ///
    /// The conditional delete guarantees the precondition held at the
    /// moment of deletion; triggers are canceled right after, and one
    /// that fires in between finds the record gone and drops.
    ///
    /// # Errors
    ///
    /// - [`CoreError::NotFound`]: unknown event
    /// - [`CoreError::Forbidden`]: requester is not the host
    /// - [`CoreError::Conflict`]: event no longer `Waiting` with only the
    ///   host on the roster
    /// - [`CoreError::Storage`]: repository failure or persistent write
    ///   contention
    pub async fn remove(&self, event_id: EventId, requester: UserId) -> Result<(), CoreError> {
        for _ in 0..MAX_WRITE_ATTEMPTS {
            let current = self.get(event_id).await?;
            validate_host_mutation(&current.event, requester)?;

            match self.repository.remove(event_id, current.version).await {
                Ok(()) => {
                    self.scheduler.cancel_for_event(event_id).await;
                    metrics::counter!("pickup_events_removed_total").increment(1);
                    info!(event_id = %event_id, "event removed");
                    return Ok(());
                }
                Err(StoreError::VersionConflict { .. }) => continue,
                Err(StoreError::NotFound(_)) => {
                    return Err(CoreError::not_found("event", event_id));
                }
                Err(e) => return Err(CoreError::Storage(e.to_string())),
            }
        }

        Err(CoreError::Storage(format!(
            "gave up removing event {event_id} after {MAX_WRITE_ATTEMPTS} attempts"
        )))
    }
}
