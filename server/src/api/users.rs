//! User endpoints: the thin registration wrapper over the directory.
//!
//! - `POST /api/users` - Register a user
//! - `GET /api/users/:id` - Get a user

use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use pickup_core::{UserId, users::UserRecord};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request to register a user.
#[derive(Debug, Deserialize)]
pub struct RegisterUserRequest {
    /// Display name
    pub name: String,
    /// Contact email
    pub email: String,
}

/// A user as returned by the API.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    /// User id
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// Contact email
    pub email: String,
    /// Registration time
    pub created_at: DateTime<Utc>,
}

impl From<&UserRecord> for UserResponse {
    fn from(record: &UserRecord) -> Self {
        Self {
            id: *record.id.as_uuid(),
            name: record.name.clone(),
            email: record.email.clone(),
            created_at: record.created_at,
        }
    }
}

/// Success envelope for a single user.
#[derive(Debug, Serialize)]
pub struct UserEnvelope {
    /// The user
    pub user: UserResponse,
}

/// Register a new user.
pub async fn register_user(
    State(state): State<AppState>,
    Json(request): Json<RegisterUserRequest>,
) -> Result<(StatusCode, Json<UserEnvelope>), ApiError> {
    let record = state.users.register(&request.name, &request.email).await?;
    Ok((
        StatusCode::CREATED,
        Json(UserEnvelope {
            user: UserResponse::from(&record),
        }),
    ))
}

/// Get a user by id.
pub async fn get_user(
    Path(user_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<UserEnvelope>, ApiError> {
    use pickup_core::users::UserDirectory;

    let record = state
        .users
        .find(UserId::from_uuid(user_id))
        .await?
        .ok_or_else(|| ApiError::not_found("user", user_id))?;
    Ok(Json(UserEnvelope {
        user: UserResponse::from(&record),
    }))
}
