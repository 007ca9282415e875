//! HTTP API endpoints.

pub mod events;
pub mod health;
pub mod notifications;
pub mod players;
pub mod users;
