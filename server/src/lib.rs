//! HTTP façade for the Pickup meetup backend.
//!
//! Thin axum layer over `pickup-core`: request parsing, bearer-token
//! resolution, error-to-status mapping and the stored-notification /
//! websocket collaborator surfaces. All business rules live in the core;
//! handlers translate and delegate.

pub mod api;
pub mod config;
pub mod error;
pub mod extract;
pub mod metrics;
pub mod notifications;
pub mod routes;
pub mod state;

pub use config::Config;
pub use error::ApiError;
pub use routes::build_router;
pub use state::AppState;
