//! Outbound ports used by the handlers, with in-memory implementations.

pub mod clock;
pub mod ids;
pub mod publisher;
pub mod vessels;

use thiserror::Error;

pub use clock::{Clock, FixedClock, SystemClock};
pub use ids::{IdProvider, UuidV7Provider};
pub use publisher::{EventPublisher, InMemoryEventPublisher};
pub use vessels::{InMemoryVesselRegistry, VesselChecker};

/// Failure of an external collaborator.
///
/// The collaborator's own error is kept as the source so callers can walk
/// the whole chain.
#[derive(Debug, Error)]
#[error("{port} unavailable")]
pub struct PortError {
    pub port: &'static str,
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync>,
}

impl PortError {
    /// `source` may be any error, or plain text when there is none.
    pub fn new(
        port: &'static str,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            port,
            source: source.into(),
        }
    }
}
