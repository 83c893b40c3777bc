//! Domain layer for the cargo tracker.
//!
//! This crate provides:
//! - the append-only tracking ledger
//! - item and status value objects with their validation rules
//! - the Cargo aggregate with its status state machine
//! - update options and domain events

pub mod cargo;
pub mod error;
pub mod events;
pub mod items;
pub mod status;
pub mod tracking;
pub mod update;

pub use cargo::{Cargo, CargoRecord};
pub use error::{CargoError, ItemsError};
pub use events::{CargoEvent, DomainEvent, StatusUpdatedData};
pub use items::{Item, Items};
pub use status::CargoStatus;
pub use tracking::{EntryType, Tracking, TrackingEntry};
pub use update::UpdateOption;
