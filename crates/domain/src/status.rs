//! Cargo status state machine.

use serde::{Deserialize, Serialize};

use crate::error::CargoError;

/// The lifecycle status of a cargo.
///
/// State transitions:
/// ```text
/// Pending ──► InTransit ──► Delivered
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CargoStatus {
    /// Cargo registered, waiting to be shipped.
    #[default]
    Pending,

    /// Cargo is on board and moving.
    InTransit,

    /// Cargo reached its destination (terminal state).
    Delivered,
}

impl CargoStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [CargoStatus; 3] = [
        CargoStatus::Pending,
        CargoStatus::InTransit,
        CargoStatus::Delivered,
    ];

    /// Parses a status from text, ignoring ASCII case.
    pub fn parse(raw: &str) -> Result<Self, CargoError> {
        match raw.to_ascii_lowercase().as_str() {
            "pending" => Ok(CargoStatus::Pending),
            "in_transit" => Ok(CargoStatus::InTransit),
            "delivered" => Ok(CargoStatus::Delivered),
            _ => Err(CargoError::InvalidStatus(raw.to_string())),
        }
    }

    /// Returns true if `next` is the single state reachable from this one.
    pub fn can_transition_to(&self, next: CargoStatus) -> bool {
        matches!(
            (self, next),
            (CargoStatus::Pending, CargoStatus::InTransit)
                | (CargoStatus::InTransit, CargoStatus::Delivered)
        )
    }

    /// Returns true if no transition leaves this state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CargoStatus::Delivered)
    }

    /// Returns the status name as stored and published.
    pub fn as_str(&self) -> &'static str {
        match self {
            CargoStatus::Pending => "pending",
            CargoStatus::InTransit => "in_transit",
            CargoStatus::Delivered => "delivered",
        }
    }
}

impl std::fmt::Display for CargoStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CargoStatus {
    type Err = CargoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
