//! Persistence layer for oched
//!
//! Provides:
//! - Team directory and game mode catalog
//! - Training sessions with their rosters and matches
//! - Atomic multi-row operations (session + roster, round robin, cascade delete)
//! - Audit log (append-only)

mod audit;
mod sqlite;
mod traits;

pub use audit::*;
pub use sqlite::*;
pub use traits::*;

use oche_util::OcheError;
use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A guarded write found dependent rows it refuses to touch
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

impl From<StoreError> for OcheError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => OcheError::NotFound(what),
            StoreError::Conflict(msg) => OcheError::Conflict(msg),
            other => OcheError::Store(other.to_string()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use oche_util::ErrorKind;

    #[test]
    fn store_errors_map_to_taxonomy() {
        let err: OcheError = StoreError::NotFound("Match".into()).into();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err: OcheError = StoreError::Conflict("session already has matches".into()).into();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let err: OcheError = StoreError::Database("disk I/O error".into()).into();
        assert_eq!(err.kind(), ErrorKind::Store);
    }
}
