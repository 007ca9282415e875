//! In-memory event repository.
//!
//! Reference implementation of the repository port. Used by tests and as
//! the default backend when no database is configured.

use super::{EventRepository, StoreError};
use crate::types::{Event, EventId, Version, VersionedEvent};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// `HashMap`-backed repository with the same conditional-write semantics
/// as the Postgres implementation.
#[derive(Debug, Default)]
pub struct InMemoryEventRepository {
    records: RwLock<HashMap<EventId, VersionedEvent>>,
}

impl InMemoryEventRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the repository holds no records.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl EventRepository for InMemoryEventRepository {
    async fn insert(&self, event: Event) -> Result<Version, StoreError> {
        let mut records = self.records.write().await;
        if records.contains_key(&event.id) {
            return Err(StoreError::AlreadyExists(event.id));
        }
        let id = event.id;
        records.insert(
            id,
            VersionedEvent {
                event,
                version: Version::FIRST,
            },
        );
        Ok(Version::FIRST)
    }

    async fn get(&self, id: EventId) -> Result<Option<VersionedEvent>, StoreError> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<VersionedEvent>, StoreError> {
        Ok(self.records.read().await.values().cloned().collect())
    }

    async fn update(
        &self,
        id: EventId,
        expected: Version,
        event: Event,
    ) -> Result<Version, StoreError> {
        let mut records = self.records.write().await;
        let Some(current) = records.get_mut(&id) else {
            return Err(StoreError::NotFound(id));
        };
        if current.version != expected {
            return Err(StoreError::VersionConflict {
                id,
                expected,
                actual: current.version,
            });
        }
        current.event = event;
        current.version = current.version.next();
        Ok(current.version)
    }

    async fn remove(&self, id: EventId, expected: Version) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let Some(current) = records.get(&id) else {
            return Err(StoreError::NotFound(id));
        };
        if current.version != expected {
            return Err(StoreError::VersionConflict {
                id,
                expected,
                actual: current.version,
            });
        }
        records.remove(&id);
        Ok(())
    }
}
