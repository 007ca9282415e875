//! Membership endpoints.
//!
//! - `POST /api/events/:id/join` - Join an event (requires auth)
//! - `POST /api/events/:id/leave` - Leave an event (requires auth)
//! - `GET /api/events/:id/players` - List an event's players (public)

use crate::api::users::{UserEnvelope, UserResponse};
use crate::error::ApiError;
use crate::extract::AuthenticatedUser;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use pickup_core::EventId;
use serde::Serialize;
use uuid::Uuid;

/// Success envelope for a player listing.
#[derive(Debug, Serialize)]
pub struct PlayersResponse {
    /// Full records of the event's players
    pub players: Vec<UserResponse>,
}

/// Join an event as the authenticated user.
pub async fn join_event(
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(event_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<UserEnvelope>, ApiError> {
    let record = state
        .membership
        .join(user_id, EventId::from_uuid(event_id))
        .await?;
    Ok(Json(UserEnvelope {
        user: UserResponse::from(&record),
    }))
}

/// Leave an event as the authenticated user.
pub async fn leave_event(
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(event_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    state
        .membership
        .leave(user_id, EventId::from_uuid(event_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List an event's players with their full records.
pub async fn list_players(
    Path(event_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<PlayersResponse>, ApiError> {
    let players = state
        .membership
        .list_players(EventId::from_uuid(event_id))
        .await?;
    Ok(Json(PlayersResponse {
        players: players.iter().map(UserResponse::from).collect(),
    }))
}
