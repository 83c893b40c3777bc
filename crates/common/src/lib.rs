//! Shared identifier types for the cargo tracker.

mod ids;

pub use ids::{CargoId, IdError, TrackingId, VesselId};
