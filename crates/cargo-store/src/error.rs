use chrono::{DateTime, Utc};
use common::{CargoId, TrackingId};
use thiserror::Error;

/// Errors that can occur when reading or writing cargo.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No cargo with this id, or it was soft-deleted.
    #[error("cargo not found: {0}")]
    NotFound(CargoId),

    /// A new cargo collided with an existing id.
    #[error("cargo already exists: {0}")]
    AlreadyExists(CargoId),

    /// A ledger entry with this id is already stored for the cargo.
    #[error("tracking entry {tracking_id} already recorded for cargo {cargo_id}")]
    TrackingConflict {
        cargo_id: CargoId,
        tracking_id: TrackingId,
    },

    /// Storage already holds a root at least as recent as the write.
    #[error("stale write for cargo {cargo_id}: stored {stored} is not before {attempted}")]
    StaleWrite {
        cargo_id: CargoId,
        stored: DateTime<Utc>,
        attempted: DateTime<Utc>,
    },

    /// The root changed in storage after this copy was loaded.
    #[error("concurrent modification of cargo {cargo_id}: loaded at {expected}, stored is {actual}")]
    ConcurrencyConflict {
        cargo_id: CargoId,
        expected: DateTime<Utc>,
        actual: DateTime<Utc>,
    },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored value could not be mapped back onto the domain.
    #[error("Corrupt stored value: {0}")]
    Decode(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    /// True when the write was older than what is stored and nothing changed.
    pub fn is_stale(&self) -> bool {
        matches!(self, StoreError::StaleWrite { .. })
    }

    /// True for conflicts caused by the caller's data rather than the store.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            StoreError::AlreadyExists(_)
                | StoreError::TrackingConflict { .. }
                | StoreError::ConcurrencyConflict { .. }
        )
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
