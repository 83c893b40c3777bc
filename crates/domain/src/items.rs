//! Cargo contents.

use serde::{Deserialize, Serialize};

use crate::error::ItemsError;

pub const MIN_ITEMS_PER_CARGO: usize = 1;
pub const MAX_ITEMS_PER_CARGO: usize = 10;
/// Grams.
pub const MIN_ITEM_WEIGHT: u64 = 1;
/// Grams.
pub const MAX_ITEM_WEIGHT: u64 = 10_000;
/// Grams.
pub const MIN_CARGO_WEIGHT: u64 = 100;
/// Grams.
pub const MAX_CARGO_WEIGHT: u64 = 50_000;
pub const MIN_ITEM_NAME_LEN: usize = 1;
pub const MAX_ITEM_NAME_LEN: usize = 255;

/// A single item carried by a cargo.
///
/// Constructing an item does not validate it; bounds are checked when the
/// items are collected into [`Items`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    name: String,
    weight: u64,
}

impl Item {
    /// Creates an item with a weight in grams.
    pub fn new(name: impl Into<String>, weight: u64) -> Self {
        Self {
            name: name.into(),
            weight,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Weight in grams.
    pub fn weight(&self) -> u64 {
        self.weight
    }
}

/// A validated, non-empty collection of items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Items(Vec<Item>);

impl Items {
    /// Validates the collection as a whole.
    ///
    /// Checks run in order: item count, total weight, then each item's name
    /// length and weight. The first violation is returned.
    pub fn new(items: Vec<Item>) -> Result<Self, ItemsError> {
        let count = items.len();
        if !(MIN_ITEMS_PER_CARGO..=MAX_ITEMS_PER_CARGO).contains(&count) {
            return Err(ItemsError::Count {
                count,
                min: MIN_ITEMS_PER_CARGO,
                max: MAX_ITEMS_PER_CARGO,
            });
        }

        let weight = total_weight(&items);
        if !(MIN_CARGO_WEIGHT..=MAX_CARGO_WEIGHT).contains(&weight) {
            return Err(ItemsError::TotalWeight {
                weight,
                min: MIN_CARGO_WEIGHT,
                max: MAX_CARGO_WEIGHT,
            });
        }

        for (index, item) in items.iter().enumerate() {
            let length = item.name.chars().count();
            if !(MIN_ITEM_NAME_LEN..=MAX_ITEM_NAME_LEN).contains(&length) {
                return Err(ItemsError::ItemName {
                    index,
                    length,
                    min: MIN_ITEM_NAME_LEN,
                    max: MAX_ITEM_NAME_LEN,
                });
            }

            if !(MIN_ITEM_WEIGHT..=MAX_ITEM_WEIGHT).contains(&item.weight) {
                return Err(ItemsError::ItemWeight {
                    index,
                    weight: item.weight,
                    min: MIN_ITEM_WEIGHT,
                    max: MAX_ITEM_WEIGHT,
                });
            }
        }

        Ok(Self(items))
    }

    /// Rebuilds a collection read back from storage without re-validating it.
    pub fn restore(items: Vec<Item>) -> Self {
        Self(items)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total weight in grams.
    pub fn weight(&self) -> u64 {
        total_weight(&self.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Item] {
        &self.0
    }
}

fn total_weight(items: &[Item]) -> u64 {
    items
        .iter()
        .fold(0u64, |total, item| total.saturating_add(item.weight))
}
