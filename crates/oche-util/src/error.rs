//! Error types for oche

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse classification of an [`OcheError`], used by transports to pick
/// a response code without inspecting message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    InvalidInput,
    Conflict,
    Store,
    Internal,
}

/// Core error type for oche operations
#[derive(Debug, Error)]
pub enum OcheError {
    /// A session, match, attendee, player or game mode does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// The session or match is in a status that forbids the operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Malformed or out-of-enum input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Blocked by existing dependent state
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl OcheError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            OcheError::NotFound(_) => ErrorKind::NotFound,
            OcheError::InvalidState(_) => ErrorKind::InvalidState,
            OcheError::InvalidInput(_) => ErrorKind::InvalidInput,
            OcheError::Conflict(_) => ErrorKind::Conflict,
            OcheError::Store(_) => ErrorKind::Store,
            OcheError::Internal(_) => ErrorKind::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, OcheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        assert_eq!(OcheError::not_found("session").kind(), ErrorKind::NotFound);
        assert_eq!(OcheError::invalid_state("x").kind(), ErrorKind::InvalidState);
        assert_eq!(OcheError::invalid_input("x").kind(), ErrorKind::InvalidInput);
        assert_eq!(OcheError::conflict("x").kind(), ErrorKind::Conflict);
    }

    #[test]
    fn not_found_message() {
        let err = OcheError::not_found("Training session");
        assert_eq!(err.to_string(), "Training session not found");
    }
}
