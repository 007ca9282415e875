//! Request extractors.
//!
//! Token issuance and validation are an external collaborator; the
//! extractor is the seam. A request authenticates with
//! `Authorization: Bearer <user-id>` and handlers (or the core's own
//! existence checks) resolve the id against the user directory.

use crate::error::ApiError;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use pickup_core::UserId;
use uuid::Uuid;

/// The authenticated requester, parsed from the bearer token.
#[derive(Clone, Copy, Debug)]
pub struct AuthenticatedUser(pub UserId);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or_else(|| ApiError::unauthorized("missing Authorization header"))?;
        let value = header
            .to_str()
            .map_err(|_| ApiError::unauthorized("malformed Authorization header"))?;
        let token = value
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::unauthorized("expected a bearer token"))?;
        let user_id = Uuid::parse_str(token.trim())
            .map_err(|_| ApiError::unauthorized("malformed bearer token"))?;
        Ok(Self(UserId::from_uuid(user_id)))
    }
}
