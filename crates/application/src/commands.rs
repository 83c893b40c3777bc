//! Mutating messages.

use bus::{Blocking, Message};
use domain::Item;
use serde::{Deserialize, Serialize};

/// One item as supplied by the caller, not yet validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemInput {
    pub name: String,
    /// Grams.
    pub weight: u64,
}

impl ItemInput {
    pub fn new(name: impl Into<String>, weight: u64) -> Self {
        Self {
            name: name.into(),
            weight,
        }
    }

    pub(crate) fn into_item(self) -> Item {
        Item::new(self.name, self.weight)
    }
}

/// Registers a new pending cargo on an existing vessel.
///
/// The caller chooses the cargo id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCargo {
    pub id: String,
    pub vessel_id: String,
    pub items: Vec<ItemInput>,
}

impl Message for CreateCargo {
    const TYPE: &'static str = "create_cargo_command";
}

/// Moves a cargo to a new status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCargoStatus {
    pub id: String,
    pub new_status: String,
}

impl UpdateCargoStatus {
    pub fn new(id: impl Into<String>, new_status: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            new_status: new_status.into(),
        }
    }
}

impl Message for UpdateCargoStatus {
    const TYPE: &'static str = "update_cargo_status_command";
}

impl Blocking for UpdateCargoStatus {
    fn blocking_key(&self) -> String {
        format!("cargo_update:{}", self.id)
    }
}
