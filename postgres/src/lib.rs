//! `PostgreSQL` event repository for the Pickup backend.
//!
//! Implements the `EventRepository` port from `pickup-core` as a document
//! store: one row per event holding the serialized document and its
//! version. The version check rides on a conditional `UPDATE`/`DELETE`,
//! so the compare-and-swap is a single statement and two writers can
//! never both succeed against the same version.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE events (
//!     id UUID PRIMARY KEY,
//!     version BIGINT NOT NULL,
//!     doc JSONB NOT NULL
//! );
//! ```
//!
//! # Example
//!
//! ```ignore
//! use pickup_postgres::PostgresEventRepository;
//!
//! let repo = PostgresEventRepository::connect("postgres://localhost/pickup", 10).await?;
//! repo.migrate().await?;
//! ```

use async_trait::async_trait;
use pickup_core::store::{EventRepository, StoreError};
use pickup_core::types::{Event, EventId, Version, VersionedEvent};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use tracing::info;

const CREATE_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS events (
    id UUID PRIMARY KEY,
    version BIGINT NOT NULL,
    doc JSONB NOT NULL
)
";

fn backend(error: sqlx::Error) -> StoreError {
    StoreError::Backend(error.to_string())
}

fn stored_version(raw: i64) -> Result<Version, StoreError> {
    u64::try_from(raw)
        .map(Version::new)
        .map_err(|_| StoreError::Backend(format!("invalid stored version {raw}")))
}

fn bound_version(version: Version) -> Result<i64, StoreError> {
    i64::try_from(version.get())
        .map_err(|_| StoreError::Backend(format!("version {version} exceeds column range")))
}

/// `PostgreSQL`-backed event repository.
#[derive(Clone)]
pub struct PostgresEventRepository {
    pool: PgPool,
}

impl PostgresEventRepository {
    /// Wrap an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to `url` with a pool of up to `max_connections`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] when the connection fails.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(backend)?;
        info!(max_connections, "connected to postgres event repository");
        Ok(Self { pool })
    }

    /// Create the `events` table if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] when the DDL fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_TABLE)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn current_version(&self, id: EventId) -> Result<Option<Version>, StoreError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT version FROM events WHERE id = $1")
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        row.map(|(raw,)| stored_version(raw)).transpose()
    }
}

#[async_trait]
impl EventRepository for PostgresEventRepository {
    async fn insert(&self, event: Event) -> Result<Version, StoreError> {
        let result =
            sqlx::query("INSERT INTO events (id, version, doc) VALUES ($1, $2, $3) ON CONFLICT (id) DO NOTHING")
                .bind(*event.id.as_uuid())
                .bind(bound_version(Version::FIRST)?)
                .bind(Json(&event))
                .execute(&self.pool)
                .await
                .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AlreadyExists(event.id));
        }
        Ok(Version::FIRST)
    }

    async fn get(&self, id: EventId) -> Result<Option<VersionedEvent>, StoreError> {
        let row: Option<(i64, Json<Event>)> =
            sqlx::query_as("SELECT version, doc FROM events WHERE id = $1")
                .bind(*id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(backend)?;

        row.map(|(raw, Json(event))| {
            Ok(VersionedEvent {
                event,
                version: stored_version(raw)?,
            })
        })
        .transpose()
    }

    async fn list(&self) -> Result<Vec<VersionedEvent>, StoreError> {
        let rows: Vec<(i64, Json<Event>)> = sqlx::query_as("SELECT version, doc FROM events")
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;

        rows.into_iter()
            .map(|(raw, Json(event))| {
                Ok(VersionedEvent {
                    event,
                    version: stored_version(raw)?,
                })
            })
            .collect()
    }

    async fn update(
        &self,
        id: EventId,
        expected: Version,
        event: Event,
    ) -> Result<Version, StoreError> {
        let result =
            sqlx::query("UPDATE events SET version = version + 1, doc = $3 WHERE id = $1 AND version = $2")
                .bind(*id.as_uuid())
                .bind(bound_version(expected)?)
                .bind(Json(&event))
                .execute(&self.pool)
                .await
                .map_err(backend)?;

        if result.rows_affected() == 1 {
            return Ok(expected.next());
        }

        // The conditional write missed: either the row is gone or another
        // writer advanced the version.
        match self.current_version(id).await? {
            None => Err(StoreError::NotFound(id)),
            Some(actual) => Err(StoreError::VersionConflict {
                id,
                expected,
                actual,
            }),
        }
    }

    async fn remove(&self, id: EventId, expected: Version) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1 AND version = $2")
            .bind(*id.as_uuid())
            .bind(bound_version(expected)?)
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        match self.current_version(id).await? {
            None => Err(StoreError::NotFound(id)),
            Some(actual) => Err(StoreError::VersionConflict {
                id,
                expected,
                actual,
            }),
        }
    }
}
