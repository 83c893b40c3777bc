use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::CargoId;
use domain::Cargo;

use crate::{Result, StoreError};

/// Controls what [`CargoRepository::find`] loads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FindOptions {
    /// Load the tracking ledger along with the root.
    pub with_tracking: bool,
    /// Return soft-deleted cargo instead of reporting it missing.
    pub include_deleted: bool,
}

impl FindOptions {
    /// Root only, soft-deleted cargo excluded.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tracking(mut self) -> Self {
        self.with_tracking = true;
        self
    }

    pub fn include_deleted(mut self) -> Self {
        self.include_deleted = true;
        self
    }
}

/// Gateway between the cargo aggregate and durable storage.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait CargoRepository: Send + Sync {
    /// Loads a cargo by id.
    ///
    /// Fails with `NotFound` when the cargo does not exist, or when it was
    /// soft-deleted and `options.include_deleted` is false. Without
    /// `with_tracking` the returned aggregate has an empty ledger.
    async fn find(&self, id: CargoId, options: FindOptions) -> Result<Cargo>;

    /// Persists the root and every unpersisted ledger entry as one unit.
    ///
    /// A new aggregate is inserted (`AlreadyExists` on collision); an
    /// existing one is updated (`NotFound` if it is missing or
    /// soft-deleted). A ledger row whose id is already stored fails with
    /// `TrackingConflict`. On any failure nothing is written.
    ///
    /// Updates are ordered by `updated_at`: when the stored root is at least
    /// as recent as `cargo` the save fails with `StaleWrite`, and when the
    /// stored root differs from the one `cargo` was loaded from it fails with
    /// `ConcurrencyConflict`.
    async fn save(&self, cargo: &Cargo) -> Result<()>;
}

/// Rejects a write that is not newer than the stored root, or that was
/// prepared from a copy someone else has written over since.
pub(crate) fn check_write_order(cargo: &Cargo, stored: DateTime<Utc>) -> Result<()> {
    let id = cargo.id();
    if stored >= cargo.updated_at() {
        return Err(StoreError::StaleWrite {
            cargo_id: id,
            stored,
            attempted: cargo.updated_at(),
        });
    }

    match cargo.persisted_updated_at() {
        Some(loaded) if loaded != stored => Err(StoreError::ConcurrencyConflict {
            cargo_id: id,
            expected: loaded,
            actual: stored,
        }),
        _ => Ok(()),
    }
}
