//! User directory port.
//!
//! User management proper (credentials, sessions, profiles) lives outside
//! the core; the core only needs existence checks and record lookups for
//! membership operations. The in-memory directory doubles as the backing
//! store for the thin registration endpoint in the server.

use crate::clock::Clock;
use crate::error::CoreError;
use crate::types::UserId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A registered user as seen by the core.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Unique user identifier
    pub id: UserId,
    /// Display name
    pub name: String,
    /// Contact email
    pub email: String,
    /// When the user registered
    pub created_at: DateTime<Utc>,
}

/// Lookup of users by id.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Resolve a user id to its record, `None` when unknown.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Storage`] when the backing store fails.
    async fn find(&self, id: UserId) -> Result<Option<UserRecord>, CoreError>;
}

/// In-memory user directory.
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<UserId, UserRecord>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryUserDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Register a new user and return the record.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] for an empty name or an email
    /// without an `@`.
    pub async fn register(&self, name: &str, email: &str) -> Result<UserRecord, CoreError> {
        if name.trim().is_empty() {
            return Err(CoreError::validation("user name cannot be empty"));
        }
        if !email.contains('@') {
            return Err(CoreError::validation(format!("invalid email: {email}")));
        }
        let record = UserRecord {
            id: UserId::new(),
            name: name.trim().to_string(),
            email: email.to_string(),
            created_at: self.clock.now(),
        };
        self.users.write().await.insert(record.id, record.clone());
        Ok(record)
    }

    /// Insert a pre-built record, for tests and seeding.
    pub async fn insert(&self, record: UserRecord) {
        self.users.write().await.insert(record.id, record);
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find(&self, id: UserId) -> Result<Option<UserRecord>, CoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;

    #[tokio::test]
    async fn register_and_find() {
        let directory = InMemoryUserDirectory::new(Arc::new(SystemClock));
        let record = directory.register("Ada", "ada@example.com").await.unwrap();

        let found = directory.find(record.id).await.unwrap().unwrap();
        assert_eq!(found, record);
        assert!(directory.find(UserId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn register_validates_input() {
        let directory = InMemoryUserDirectory::new(Arc::new(SystemClock));
        assert!(matches!(
            directory.register("  ", "ada@example.com").await,
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            directory.register("Ada", "not-an-email").await,
            Err(CoreError::Validation(_))
        ));
    }
}
