//! Read-only messages and their results.

use bus::Message;
use chrono::{DateTime, Utc};
use domain::{Cargo, CargoStatus, TrackingEntry};
use serde::{Deserialize, Serialize};

/// Loads a single cargo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchCargoById {
    pub id: String,
    /// Include the tracking ledger in the result.
    #[serde(default)]
    pub with_tracking: bool,
}

impl FetchCargoById {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            with_tracking: false,
        }
    }

    pub fn with_tracking(mut self) -> Self {
        self.with_tracking = true;
        self
    }
}

impl Message for FetchCargoById {
    const TYPE: &'static str = "fetch_cargo_by_id";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemView {
    pub name: String,
    pub weight: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingView {
    pub id: String,
    pub entry_type: String,
    pub status_before: Option<String>,
    pub status_after: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&TrackingEntry> for TrackingView {
    fn from(entry: &TrackingEntry) -> Self {
        Self {
            id: entry.id().to_string(),
            entry_type: entry.entry_type().to_string(),
            status_before: entry.status_before().map(str::to_string),
            status_after: entry.status_after().map(str::to_string),
            created_at: entry.created_at(),
        }
    }
}

/// Snapshot of a cargo returned to callers.
///
/// `tracking` is empty unless the query asked for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CargoView {
    pub id: String,
    pub vessel_id: String,
    pub items: Vec<ItemView>,
    pub status: CargoStatus,
    /// Grams.
    pub total_weight: u64,
    pub tracking: Vec<TrackingView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Cargo> for CargoView {
    fn from(cargo: &Cargo) -> Self {
        Self {
            id: cargo.id().to_string(),
            vessel_id: cargo.vessel_id().to_string(),
            items: cargo
                .items()
                .iter()
                .map(|item| ItemView {
                    name: item.name().to_string(),
                    weight: item.weight(),
                })
                .collect(),
            status: cargo.status(),
            total_weight: cargo.weight(),
            tracking: cargo.tracking().iter().map(TrackingView::from).collect(),
            created_at: cargo.created_at(),
            updated_at: cargo.updated_at(),
        }
    }
}
