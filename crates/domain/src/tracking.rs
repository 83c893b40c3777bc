//! Append-only tracking ledger.

use chrono::{DateTime, Utc};
use common::TrackingId;
use serde::{Deserialize, Serialize};

use crate::error::CargoError;
use crate::status::CargoStatus;

/// The kind of lifecycle event a tracking entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryType {
    #[serde(rename = "cargo.created")]
    Created,
    #[serde(rename = "cargo.status_changed")]
    StatusChanged,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Created => "cargo.created",
            EntryType::StatusChanged => "cargo.status_changed",
        }
    }

    /// Parses the stored entry type name.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "cargo.created" => Some(EntryType::Created),
            "cargo.status_changed" => Some(EntryType::StatusChanged),
            _ => None,
        }
    }
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One immutable audit record in a cargo's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingEntry {
    id: TrackingId,
    entry_type: EntryType,
    status_before: Option<String>,
    status_after: Option<String>,
    created_at: DateTime<Utc>,
}

impl TrackingEntry {
    /// Records the creation of a cargo. The initial status is both before and after.
    pub fn on_created(
        id: &str,
        initial_status: CargoStatus,
        at: DateTime<Utc>,
    ) -> Result<Self, CargoError> {
        let id = TrackingId::parse(id).map_err(CargoError::invalid_id("tracking"))?;

        Ok(Self {
            id,
            entry_type: EntryType::Created,
            status_before: Some(initial_status.to_string()),
            status_after: Some(initial_status.to_string()),
            created_at: at,
        })
    }

    /// Records a status transition.
    pub fn on_status_changed(
        id: &str,
        at: DateTime<Utc>,
        before: CargoStatus,
        after: CargoStatus,
    ) -> Result<Self, CargoError> {
        let id = TrackingId::parse(id).map_err(CargoError::invalid_id("tracking"))?;

        Ok(Self {
            id,
            entry_type: EntryType::StatusChanged,
            status_before: Some(before.to_string()),
            status_after: Some(after.to_string()),
            created_at: at,
        })
    }

    /// Rebuilds an entry read back from storage.
    pub fn restore(
        id: TrackingId,
        entry_type: EntryType,
        status_before: Option<String>,
        status_after: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            entry_type,
            status_before,
            status_after,
            created_at,
        }
    }

    pub fn id(&self) -> TrackingId {
        self.id
    }

    pub fn entry_type(&self) -> EntryType {
        self.entry_type
    }

    pub fn status_before(&self) -> Option<&str> {
        self.status_before.as_deref()
    }

    pub fn status_after(&self) -> Option<&str> {
        self.status_after.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Ordered history of a cargo. Entries are only ever appended.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tracking(Vec<TrackingEntry>);

impl Tracking {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry to the tail.
    pub fn append(&mut self, entry: TrackingEntry) {
        self.0.push(entry);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&TrackingEntry> {
        self.0.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackingEntry> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[TrackingEntry] {
        &self.0
    }
}

impl From<Vec<TrackingEntry>> for Tracking {
    fn from(entries: Vec<TrackingEntry>) -> Self {
        Self(entries)
    }
}
