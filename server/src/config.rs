//! Configuration management for the Pickup server.
//!
//! Loads configuration from environment variables with sensible defaults.

use serde::{Deserialize, Serialize};
use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Event repository configuration
    pub database: DatabaseConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Metrics server host (for Prometheus scraping)
    pub metrics_host: String,
    /// Metrics server port
    pub metrics_port: u16,
}

/// Event repository configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL; the in-memory repository is used when
    /// unset
    pub url: Option<String>,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
}

impl Config {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(8080),
                log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
                metrics_host: env::var("METRICS_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                metrics_port: env::var("METRICS_PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(9090),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").ok(),
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            },
        }
    }
}
