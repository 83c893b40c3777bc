//! Named mutations accepted by [`Cargo::apply_update`](crate::Cargo::apply_update).

use chrono::{DateTime, Utc};

use crate::cargo::Cargo;
use crate::error::CargoError;
use crate::status::CargoStatus;

/// A single mutation with the parameters it needs.
///
/// Options carry raw caller input; validation happens when the option is
/// applied so that every failure surfaces through the same path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOption {
    /// Move the cargo to `status`, recording the change under `tracking_id`.
    Status {
        tracking_id: String,
        status: String,
        at: DateTime<Utc>,
    },
}

impl UpdateOption {
    pub fn with_status(
        tracking_id: impl Into<String>,
        status: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        UpdateOption::Status {
            tracking_id: tracking_id.into(),
            status: status.into(),
            at,
        }
    }

    pub(crate) fn apply(self, cargo: &mut Cargo) -> Result<(), CargoError> {
        match self {
            UpdateOption::Status {
                tracking_id,
                status,
                at,
            } => {
                let next = CargoStatus::parse(&status)?;
                cargo.change_status(&tracking_id, next, at)
            }
        }
    }
}
