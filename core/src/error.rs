//! Error taxonomy for the meetup core.
//!
//! Every fallible core operation returns a [`CoreError`] carrying the kind
//! and a human-readable message. The core never retries beyond its own
//! conditional-write cycle and no error here is fatal to the process; the
//! HTTP layer maps kinds onto status codes and the scheduler layer
//! logs-and-drops.

use std::fmt;
use thiserror::Error;

/// Typed error raised by the core components.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A referenced entity does not exist.
    #[error("{entity} with id {id} not found")]
    NotFound {
        /// Kind of entity ("event", "user", "player")
        entity: &'static str,
        /// Identifier that failed to resolve
        id: String,
    },

    /// A precondition on current state was violated (status, capacity,
    /// duplicate membership, ownership-count precondition).
    #[error("{0}")]
    Conflict(String),

    /// The acting user is not authorized for the operation.
    #[error("{0}")]
    Forbidden(String),

    /// The input was malformed or out of range.
    #[error("{0}")]
    Validation(String),

    /// The repository failed in a way the caller cannot recover from.
    #[error("storage error: {0}")]
    Storage(String),
}

impl CoreError {
    /// Creates a `NotFound` error for the given entity kind and id.
    pub fn not_found(entity: &'static str, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Creates a `Conflict` error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Creates a `Forbidden` error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    /// Creates a `Validation` error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message() {
        let err = CoreError::not_found("event", "abc");
        assert_eq!(err.to_string(), "event with id abc not found");
    }

    #[test]
    fn conflict_message_passthrough() {
        let err = CoreError::conflict("event is not accepting players");
        assert_eq!(err.to_string(), "event is not accepting players");
    }
}
