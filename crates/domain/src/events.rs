//! Cargo domain events.

use chrono::{DateTime, Utc};
use common::CargoId;
use serde::{Deserialize, Serialize};

use crate::status::CargoStatus;

/// Trait for domain events.
///
/// Domain events represent facts that have happened in the domain.
/// They are immutable and should be named in past tense.
pub trait DomainEvent: Serialize + Send + Sync + Clone {
    /// Returns the event type name used when publishing.
    fn event_type(&self) -> &'static str;

    /// Returns the id of the aggregate the event belongs to.
    fn aggregate_id(&self) -> CargoId;
}

/// Events recorded by the cargo aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CargoEvent {
    /// The cargo moved to a new status.
    StatusUpdated(StatusUpdatedData),
}

impl CargoEvent {
    pub(crate) fn status_updated(
        cargo_id: CargoId,
        old_status: CargoStatus,
        new_status: CargoStatus,
        occurred_on: DateTime<Utc>,
    ) -> Self {
        CargoEvent::StatusUpdated(StatusUpdatedData {
            cargo_id,
            old_status,
            new_status,
            occurred_on,
        })
    }
}

impl DomainEvent for CargoEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CargoEvent::StatusUpdated(_) => "cargo-status-updated-v1",
        }
    }

    fn aggregate_id(&self) -> CargoId {
        match self {
            CargoEvent::StatusUpdated(data) => data.cargo_id,
        }
    }
}

/// Data for the StatusUpdated event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdatedData {
    pub cargo_id: CargoId,
    pub old_status: CargoStatus,
    pub new_status: CargoStatus,
    pub occurred_on: DateTime<Utc>,
}
