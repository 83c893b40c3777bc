//! Domain error types.

use common::{CargoId, IdError};
use thiserror::Error;

use crate::status::CargoStatus;

/// Errors raised by the cargo aggregate and its value objects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CargoError {
    /// An identifier did not validate.
    #[error("invalid {field} identifier: {source}")]
    InvalidIdentifier {
        field: &'static str,
        #[source]
        source: IdError,
    },

    /// The item collection broke a cardinality, weight or naming bound.
    #[error("invalid items provided: {0}")]
    InvalidItems(#[from] ItemsError),

    /// The status text is not a known cargo status.
    #[error("invalid cargo status provided: {0:?}")]
    InvalidStatus(String),

    /// The requested status is not reachable from the current one.
    #[error("status transition not allowed: {from} -> {to}")]
    StatusTransitionNotAllowed { from: CargoStatus, to: CargoStatus },

    /// The cargo was soft-deleted and can no longer change.
    #[error("cargo {id} is not modifiable (status {status})")]
    NotModifiable { id: CargoId, status: CargoStatus },
}

impl CargoError {
    pub(crate) fn invalid_id(field: &'static str) -> impl FnOnce(IdError) -> Self {
        move |source| CargoError::InvalidIdentifier { field, source }
    }

    /// Returns true for malformed input that will never succeed on retry.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CargoError::InvalidIdentifier { .. }
                | CargoError::InvalidItems(_)
                | CargoError::InvalidStatus(_)
        )
    }
}

/// Collection-level item validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItemsError {
    #[error("number of items is invalid: {count} (allowed {min}..={max})")]
    Count { count: usize, min: usize, max: usize },

    #[error("total weight of items is invalid: {weight}g (allowed {min}..={max})")]
    TotalWeight { weight: u64, min: u64, max: u64 },

    #[error("item #{index} name is invalid: {length} chars (allowed {min}..={max})")]
    ItemName {
        index: usize,
        length: usize,
        min: usize,
        max: usize,
    },

    #[error("item #{index} weight is invalid: {weight}g (allowed {min}..={max})")]
    ItemWeight {
        index: usize,
        weight: u64,
        min: u64,
        max: u64,
    },
}
