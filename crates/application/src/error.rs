//! Use case errors.

use cargo_store::StoreError;
use common::{CargoId, VesselId};
use domain::CargoError;
use thiserror::Error;

use crate::ports::PortError;

/// Coarse classification callers use to decide how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The request itself is malformed; retrying it cannot succeed.
    Validation,
    /// The request conflicts with the current state.
    Conflict,
    /// The cargo or vessel does not exist.
    NotFound,
    /// A collaborator failed; the request may succeed later.
    Infrastructure,
}

/// Errors returned by the cargo handlers.
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// The aggregate or one of its value objects rejected the request.
    #[error("cargo {cargo_id}: {source}")]
    Cargo {
        cargo_id: String,
        #[source]
        source: CargoError,
    },

    /// The repository failed.
    #[error("cargo {cargo_id}: {source}")]
    Store {
        cargo_id: CargoId,
        #[source]
        source: StoreError,
    },

    #[error("vessel not found: {vessel_id}")]
    VesselNotFound { vessel_id: VesselId },

    #[error("vessel lookup for {vessel_id} failed: {source}")]
    VesselLookup {
        vessel_id: VesselId,
        #[source]
        source: PortError,
    },

    /// The change was saved but its events could not be handed off.
    #[error("publishing events for cargo {cargo_id} failed: {source}")]
    Publish {
        cargo_id: CargoId,
        #[source]
        source: PortError,
    },
}

impl ApplicationError {
    pub(crate) fn cargo(cargo_id: impl Into<String>) -> impl FnOnce(CargoError) -> Self {
        let cargo_id = cargo_id.into();
        move |source| ApplicationError::Cargo { cargo_id, source }
    }

    pub(crate) fn store(cargo_id: CargoId) -> impl FnOnce(StoreError) -> Self {
        move |source| ApplicationError::Store { cargo_id, source }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApplicationError::Cargo { source, .. } => match source {
                CargoError::InvalidIdentifier { .. }
                | CargoError::InvalidItems(_)
                | CargoError::InvalidStatus(_) => ErrorKind::Validation,
                CargoError::StatusTransitionNotAllowed { .. }
                | CargoError::NotModifiable { .. } => ErrorKind::Conflict,
            },
            ApplicationError::Store { source, .. } => match source {
                StoreError::NotFound(_) => ErrorKind::NotFound,
                StoreError::AlreadyExists(_)
                | StoreError::TrackingConflict { .. }
                | StoreError::StaleWrite { .. }
                | StoreError::ConcurrencyConflict { .. } => ErrorKind::Conflict,
                StoreError::Database(_)
                | StoreError::Migration(_)
                | StoreError::Serialization(_)
                | StoreError::Decode(_) => ErrorKind::Infrastructure,
            },
            ApplicationError::VesselNotFound { .. } => ErrorKind::NotFound,
            ApplicationError::VesselLookup { .. } | ApplicationError::Publish { .. } => {
                ErrorKind::Infrastructure
            }
        }
    }
}
