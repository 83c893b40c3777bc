//! Cargo tracker use cases.
//!
//! Commands and queries are plain messages routed by the [`bus`] crate.
//! Handlers reach the outside world only through the ports in [`ports`], so
//! the same handlers run against in-memory or PostgreSQL storage.

pub mod commands;
pub mod error;
pub mod handlers;
pub mod ports;
pub mod queries;

pub use commands::{CreateCargo, ItemInput, UpdateCargoStatus};
pub use error::{ApplicationError, ErrorKind};
pub use handlers::{
    CargoServices, CreateCargoHandler, FetchCargoByIdHandler, UpdateCargoStatusHandler,
};
pub use queries::{CargoView, FetchCargoById, ItemView, TrackingView};
