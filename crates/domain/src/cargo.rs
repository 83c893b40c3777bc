//! Cargo aggregate root.

use chrono::{DateTime, Utc};
use common::{CargoId, VesselId};

use crate::error::CargoError;
use crate::events::CargoEvent;
use crate::items::{Item, Items};
use crate::status::CargoStatus;
use crate::tracking::{Tracking, TrackingEntry};
use crate::update::UpdateOption;

/// Stored primitives a [`Cargo`] is rebuilt from.
#[derive(Debug, Clone)]
pub struct CargoRecord {
    pub id: CargoId,
    pub vessel_id: VesselId,
    pub items: Vec<Item>,
    pub status: CargoStatus,
    pub tracking: Vec<TrackingEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Cargo aggregate root.
///
/// Owns the status state machine and the tracking ledger. Every status
/// change appends exactly one ledger entry in the same call, so the two can
/// never drift apart in memory; the repository persists them as one unit.
#[derive(Debug, Clone)]
pub struct Cargo {
    id: CargoId,
    vessel_id: VesselId,
    items: Items,
    status: CargoStatus,
    tracking: Tracking,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,

    /// `updated_at` as last read from or written to storage; `None` until
    /// the root record has been written once.
    persisted_updated_at: Option<DateTime<Utc>>,
    /// Number of ledger entries that came from storage.
    persisted_tracking: usize,
    /// Recorded events not yet handed to a publisher.
    events: Vec<CargoEvent>,
}

impl Cargo {
    /// Creates a new pending cargo with a single `created` ledger entry.
    pub fn create(
        id: &str,
        vessel_id: &str,
        items: Vec<Item>,
        tracking_id: &str,
        at: DateTime<Utc>,
    ) -> Result<Self, CargoError> {
        let id = CargoId::parse(id).map_err(CargoError::invalid_id("cargo"))?;
        let vessel_id = VesselId::parse(vessel_id).map_err(CargoError::invalid_id("vessel"))?;
        let items = Items::new(items)?;

        let status = CargoStatus::Pending;
        let mut tracking = Tracking::new();
        tracking.append(TrackingEntry::on_created(tracking_id, status, at)?);

        Ok(Self {
            id,
            vessel_id,
            items,
            status,
            tracking,
            created_at: at,
            updated_at: at,
            deleted_at: None,
            persisted_updated_at: None,
            persisted_tracking: 0,
            events: Vec::new(),
        })
    }

    /// Rebuilds a cargo from stored primitives.
    ///
    /// Stored data is trusted: nothing is re-validated, and every loaded
    /// ledger entry counts as already persisted.
    pub fn restore(record: CargoRecord) -> Self {
        let persisted_tracking = record.tracking.len();

        Self {
            id: record.id,
            vessel_id: record.vessel_id,
            items: Items::restore(record.items),
            status: record.status,
            tracking: Tracking::from(record.tracking),
            created_at: record.created_at,
            updated_at: record.updated_at,
            deleted_at: record.deleted_at,
            persisted_updated_at: Some(record.updated_at),
            persisted_tracking,
            events: Vec::new(),
        }
    }

    /// Applies `options` in order, stopping at the first failure.
    ///
    /// A soft-deleted cargo rejects every update. A request whose `at` is not
    /// strictly after `updated_at` is stale and is absorbed as a successful
    /// no-op.
    pub fn apply_update(
        &mut self,
        at: DateTime<Utc>,
        options: impl IntoIterator<Item = UpdateOption>,
    ) -> Result<(), CargoError> {
        if self.is_deleted() {
            return Err(CargoError::NotModifiable {
                id: self.id,
                status: self.status,
            });
        }

        if self.updated_at >= at {
            tracing::debug!(
                cargo_id = %self.id,
                updated_at = %self.updated_at,
                requested_at = %at,
                "stale cargo update ignored"
            );
            return Ok(());
        }

        for option in options {
            option.apply(self)?;
        }

        Ok(())
    }

    pub(crate) fn change_status(
        &mut self,
        tracking_id: &str,
        next: CargoStatus,
        at: DateTime<Utc>,
    ) -> Result<(), CargoError> {
        if next == self.status {
            return Ok(());
        }

        if !self.status.can_transition_to(next) {
            return Err(CargoError::StatusTransitionNotAllowed {
                from: self.status,
                to: next,
            });
        }

        let entry = TrackingEntry::on_status_changed(tracking_id, at, self.status, next)?;
        let previous = self.status;

        self.tracking.append(entry);
        self.status = next;
        self.updated_at = at;
        self.events
            .push(CargoEvent::status_updated(self.id, previous, next, at));

        metrics::counter!("cargo_status_transitions_total", "to" => next.as_str()).increment(1);

        Ok(())
    }

    /// Drains the events recorded since the last call.
    pub fn pull_events(&mut self) -> Vec<CargoEvent> {
        std::mem::take(&mut self.events)
    }

    /// Records that the root and every ledger entry have been written.
    pub fn mark_persisted(&mut self) {
        self.persisted_updated_at = Some(self.updated_at);
        self.persisted_tracking = self.tracking.len();
    }
}

// Query methods
impl Cargo {
    pub fn id(&self) -> CargoId {
        self.id
    }

    pub fn vessel_id(&self) -> VesselId {
        self.vessel_id
    }

    pub fn items(&self) -> &Items {
        &self.items
    }

    /// Total weight of the contents in grams.
    pub fn weight(&self) -> u64 {
        self.items.weight()
    }

    pub fn status(&self) -> CargoStatus {
        self.status
    }

    /// The ledger as loaded plus everything appended since.
    ///
    /// Only contains stored entries when the cargo was loaded with its tracking.
    pub fn tracking(&self) -> &Tracking {
        &self.tracking
    }

    /// Ledger entries appended since the cargo was created or loaded.
    pub fn unpersisted_tracking(&self) -> &[TrackingEntry] {
        &self.tracking.as_slice()[self.persisted_tracking..]
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Returns true if the root record has never been stored.
    pub fn is_new(&self) -> bool {
        self.persisted_updated_at.is_none()
    }

    /// The `updated_at` storage held when this copy was loaded or last saved.
    ///
    /// Repositories compare it with the stored value to detect a write that
    /// landed in between.
    pub fn persisted_updated_at(&self) -> Option<DateTime<Utc>> {
        self.persisted_updated_at
    }
}
