//! Repository port for event records.
//!
//! The stored event record is the single source of truth for membership
//! and status. The port therefore exposes only versioned mutations:
//! writers read a record, recheck their precondition against it and write
//! back conditionally on the version they read. A
//! [`StoreError::VersionConflict`] means another writer got there first
//! and the whole read-validate-write cycle must be re-run.
//!
//! Implementations:
//!
//! - [`memory::InMemoryEventRepository`]: reference implementation, used
//!   by tests and as the default backend when no database is configured.
//! - `PostgresEventRepository` (in the `pickup-postgres` crate): document
//!   store with a conditional `UPDATE` for the version check.

pub mod memory;

use crate::types::{Event, EventId, Version, VersionedEvent};
use async_trait::async_trait;
use thiserror::Error;

/// Upper bound on read-validate-write attempts before a writer gives up.
///
/// Conflicts are expected to be rare and transient (two joins racing for
/// the same event); exhausting this bound indicates pathological
/// contention and is surfaced as a storage error.
pub const MAX_WRITE_ATTEMPTS: u32 = 5;

/// Errors raised by repository implementations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Insert of a record whose id is already present.
    #[error("event {0} already exists")]
    AlreadyExists(EventId),

    /// The record does not exist (for conditional update/remove).
    #[error("event {0} not found")]
    NotFound(EventId),

    /// Conditional write lost the race: the stored version moved on.
    #[error("version conflict on event {id}: expected {expected}, found {actual}")]
    VersionConflict {
        /// Record the conflict occurred on
        id: EventId,
        /// Version the writer read
        expected: Version,
        /// Version currently stored
        actual: Version,
    },

    /// Backend failure (connection, query, serialization).
    #[error("backend error: {0}")]
    Backend(String),
}

/// Versioned store of event records.
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Insert a new record at [`Version::FIRST`].
    ///
    /// # Errors
    ///
    /// - [`StoreError::AlreadyExists`] when the id is taken
    /// - [`StoreError::Backend`] on backend failure
    async fn insert(&self, event: Event) -> Result<Version, StoreError>;

    /// Load a record with its current version.
    ///
    /// Returns `Ok(None)` when the record does not exist — absence is a
    /// domain condition, not a backend failure.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Backend`] on backend failure
    async fn get(&self, id: EventId) -> Result<Option<VersionedEvent>, StoreError>;

    /// Load all records. Filtering and pagination happen in the service
    /// layer so both backends share one matcher.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Backend`] on backend failure
    async fn list(&self) -> Result<Vec<VersionedEvent>, StoreError>;

    /// Replace a record, conditional on its current version matching
    /// `expected`. Returns the new version.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] when the record vanished
    /// - [`StoreError::VersionConflict`] when another writer won
    /// - [`StoreError::Backend`] on backend failure
    async fn update(
        &self,
        id: EventId,
        expected: Version,
        event: Event,
    ) -> Result<Version, StoreError>;

    /// Delete a record, conditional on its current version matching
    /// `expected`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] when the record vanished
    /// - [`StoreError::VersionConflict`] when another writer won
    /// - [`StoreError::Backend`] on backend failure
    async fn remove(&self, id: EventId, expected: Version) -> Result<(), StoreError>;
}
