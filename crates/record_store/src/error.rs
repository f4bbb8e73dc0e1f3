//! Record store error types.

use thiserror::Error;

/// Errors that can occur during record store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Entity not found.
    #[error("{entity_type} not found: {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// A unique key is already taken.
    #[error("{entity_type} already exists: {key}")]
    DuplicateKey {
        entity_type: &'static str,
        key: String,
    },

    /// The stored entity changed since it was loaded.
    #[error("{entity_type} {id} was modified concurrently")]
    VersionConflict { entity_type: &'static str, id: i64 },

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Creates a not found error.
    pub fn not_found(entity_type: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity_type,
            id: id.to_string(),
        }
    }

    /// Creates a duplicate key error.
    pub fn duplicate_key(entity_type: &'static str, key: impl Into<String>) -> Self {
        Self::DuplicateKey {
            entity_type,
            key: key.into(),
        }
    }

    /// Creates a version conflict error.
    pub fn version_conflict(entity_type: &'static str, id: i64) -> Self {
        Self::VersionConflict { entity_type, id }
    }
}

/// Result type for record store operations.
pub type StoreResult<T> = Result<T, StoreError>;
