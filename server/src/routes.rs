//! Router configuration.

use crate::api::{events, health, notifications, players, users};
use crate::state::AppState;
use axum::{
    Router,
    routing::{delete, get, post, put},
};
use tower_http::trace::TraceLayer;

/// Build the complete axum router.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Users (thin collaborator wrapper)
        .route("/users", post(users::register_user))
        .route("/users/:id", get(users::get_user))
        .route("/users/:id/notifications", get(notifications::list_notifications))
        // Events
        .route("/events", post(events::create_event))
        .route("/events", get(events::list_events))
        .route("/events/:id", get(events::get_event))
        .route("/events/:id", put(events::update_event))
        .route("/events/:id", delete(events::delete_event))
        // Membership
        .route("/events/:id/join", post(players::join_event))
        .route("/events/:id/leave", post(players::leave_event))
        .route("/events/:id/players", get(players::list_players))
        // Realtime signal
        .route("/ws/notifications", get(notifications::notifications_ws));

    Router::new()
        // Health checks (no authentication)
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // API routes under /api prefix
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
