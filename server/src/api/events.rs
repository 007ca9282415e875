//! Event endpoints.
//!
//! - `POST /api/events` - Create an event (requires auth)
//! - `GET /api/events` - List events (public, filterable)
//! - `GET /api/events/:id` - Get an event (public)
//! - `PUT /api/events/:id` - Update an event (auth, host-only)
//! - `DELETE /api/events/:id` - Remove an event (auth, host-only)

use crate::error::ApiError;
use crate::extract::AuthenticatedUser;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use pickup_core::{
    CurrencyCode, Event, EventFilter, EventId, EventStatus, EventUpdate, GeoPoint, Intensity,
    Money, NewEvent, Proximity, SportId, UserId,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request to create an event.
#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    /// Event name
    pub name: String,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// Where the event takes place
    pub location: GeoPoint,
    /// Sport being played
    pub sport_id: Uuid,
    /// Start time
    pub start_at: DateTime<Utc>,
    /// End time
    pub end_at: DateTime<Utc>,
    /// Expected intensity
    pub intensity: Intensity,
    /// Player cap (at least 2)
    pub max_players: u32,
    /// Fee per player in minor currency units
    pub fee_cents: u64,
    /// ISO-4217 currency code
    pub currency: String,
}

/// Request to update an event; absent fields stay unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateEventRequest {
    /// New name
    pub name: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New location
    pub location: Option<GeoPoint>,
    /// New sport
    pub sport_id: Option<Uuid>,
    /// New start time
    pub start_at: Option<DateTime<Utc>>,
    /// New end time
    pub end_at: Option<DateTime<Utc>>,
    /// New intensity
    pub intensity: Option<Intensity>,
    /// New player cap
    pub max_players: Option<u32>,
    /// New fee in minor currency units
    pub fee_cents: Option<u64>,
    /// New currency code
    pub currency: Option<String>,
}

/// An event as returned by the API.
#[derive(Debug, Serialize)]
pub struct EventResponse {
    /// Event id
    pub id: Uuid,
    /// Event name
    pub name: String,
    /// Description
    pub description: String,
    /// Location
    pub location: GeoPoint,
    /// Sport id
    pub sport_id: Uuid,
    /// Start time
    pub start_at: DateTime<Utc>,
    /// End time
    pub end_at: DateTime<Utc>,
    /// Intensity
    pub intensity: Intensity,
    /// Player cap
    pub max_players: u32,
    /// Fee in minor currency units
    pub fee_cents: u64,
    /// Currency code
    pub currency: String,
    /// Lifecycle status
    pub status: EventStatus,
    /// Host user id
    pub host_id: Uuid,
    /// Player user ids
    pub players: Vec<Uuid>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl From<&Event> for EventResponse {
    fn from(event: &Event) -> Self {
        Self {
            id: *event.id.as_uuid(),
            name: event.name.clone(),
            description: event.description.clone(),
            location: event.location,
            sport_id: *event.sport.as_uuid(),
            start_at: event.start_at,
            end_at: event.end_at,
            intensity: event.intensity,
            max_players: event.max_players,
            fee_cents: event.fee.cents(),
            currency: event.currency.as_str().to_string(),
            status: event.status,
            host_id: *event.host.as_uuid(),
            players: event.players.iter().map(|p| *p.as_uuid()).collect(),
            created_at: event.created_at,
            updated_at: event.updated_at,
        }
    }
}

/// Success envelope for a single event.
#[derive(Debug, Serialize)]
pub struct EventEnvelope {
    /// The event
    pub event: EventResponse,
}

/// Query parameters for listing events.
#[derive(Debug, Deserialize)]
pub struct ListEventsQuery {
    /// Page number (0-indexed)
    #[serde(default)]
    pub page: usize,
    /// Page size (default 20, max 100)
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Filter by status
    pub status: Option<EventStatus>,
    /// Filter by host
    pub host: Option<Uuid>,
    /// Filter by sport
    pub sport: Option<Uuid>,
    /// Only events starting at or after this time
    pub from: Option<DateTime<Utc>>,
    /// Only events starting at or before this time
    pub until: Option<DateTime<Utc>>,
    /// Proximity search: origin longitude
    pub lon: Option<f64>,
    /// Proximity search: origin latitude
    pub lat: Option<f64>,
    /// Proximity search: radius in kilometres
    pub radius_km: Option<f64>,
}

const fn default_page_size() -> usize {
    20
}

impl ListEventsQuery {
    fn into_filter(self) -> Result<EventFilter, ApiError> {
        let near = match (self.lon, self.lat, self.radius_km) {
            (Some(lon), Some(lat), Some(radius_km)) => Some(Proximity {
                origin: GeoPoint::new(lon, lat),
                radius_km,
            }),
            (None, None, None) => None,
            _ => {
                return Err(ApiError::validation(
                    "proximity search requires lon, lat and radius_km together",
                ));
            }
        };

        Ok(EventFilter {
            host: self.host.map(UserId::from_uuid),
            sport: self.sport.map(SportId::from_uuid),
            status: self.status,
            starting_from: self.from,
            starting_until: self.until,
            near,
            page: self.page,
            page_size: self.page_size,
        })
    }
}

/// Response for listing events.
#[derive(Debug, Serialize)]
pub struct ListEventsResponse {
    /// Events on this page
    pub events: Vec<EventResponse>,
    /// Total matches across all pages
    pub total: usize,
    /// Current page
    pub page: usize,
    /// Effective page size
    pub page_size: usize,
}

// ============================================================================
// Handlers
// ============================================================================

/// Create an event; the authenticated user becomes the host.
pub async fn create_event(
    AuthenticatedUser(host): AuthenticatedUser,
    State(state): State<AppState>,
    Json(request): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<EventEnvelope>), ApiError> {
    let currency = CurrencyCode::new(&request.currency).map_err(ApiError::validation)?;

    let created = state
        .events
        .create(
            host,
            NewEvent {
                name: request.name,
                description: request.description,
                location: request.location,
                sport: SportId::from_uuid(request.sport_id),
                start_at: request.start_at,
                end_at: request.end_at,
                intensity: request.intensity,
                max_players: request.max_players,
                fee: Money::from_cents(request.fee_cents),
                currency,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(EventEnvelope {
            event: EventResponse::from(&created.event),
        }),
    ))
}

/// Get an event by id.
pub async fn get_event(
    Path(event_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<EventEnvelope>, ApiError> {
    let found = state.events.get(EventId::from_uuid(event_id)).await?;
    Ok(Json(EventEnvelope {
        event: EventResponse::from(&found.event),
    }))
}

/// List events with filters and pagination.
pub async fn list_events(
    Query(query): Query<ListEventsQuery>,
    State(state): State<AppState>,
) -> Result<Json<ListEventsResponse>, ApiError> {
    let filter = query.into_filter()?;
    let page = state.events.list(&filter).await?;
    Ok(Json(ListEventsResponse {
        events: page.events.iter().map(EventResponse::from).collect(),
        total: page.total,
        page: page.page,
        page_size: page.page_size,
    }))
}

/// Update an event. Host-only, and only while the event is waiting with
/// nobody but the host on the roster.
pub async fn update_event(
    AuthenticatedUser(requester): AuthenticatedUser,
    Path(event_id): Path<Uuid>,
    State(state): State<AppState>,
    Json(request): Json<UpdateEventRequest>,
) -> Result<Json<EventEnvelope>, ApiError> {
    let currency = request
        .currency
        .as_deref()
        .map(CurrencyCode::new)
        .transpose()
        .map_err(ApiError::validation)?;

    let update = EventUpdate {
        name: request.name,
        description: request.description,
        location: request.location,
        sport: request.sport_id.map(SportId::from_uuid),
        start_at: request.start_at,
        end_at: request.end_at,
        intensity: request.intensity,
        max_players: request.max_players,
        fee: request.fee_cents.map(Money::from_cents),
        currency,
    };

    let updated = state
        .events
        .update(EventId::from_uuid(event_id), requester, update)
        .await?;
    Ok(Json(EventEnvelope {
        event: EventResponse::from(&updated.event),
    }))
}

/// Remove an event. Same precondition as update; pending lifecycle
/// triggers are canceled.
pub async fn delete_event(
    AuthenticatedUser(requester): AuthenticatedUser,
    Path(event_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    state
        .events
        .remove(EventId::from_uuid(event_id), requester)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
