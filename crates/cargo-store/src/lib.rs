//! Persistence for the cargo aggregate.
//!
//! A cargo and its tracking ledger are always written together: either the
//! root row and every new ledger row land, or none of them do.

pub mod error;
pub mod locks;
pub mod memory;
pub mod postgres;
pub mod repository;

pub use error::{Result, StoreError};
pub use locks::PostgresLockService;
pub use memory::InMemoryCargoRepository;
pub use postgres::PostgresCargoRepository;
pub use repository::{CargoRepository, FindOptions};
