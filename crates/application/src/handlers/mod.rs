//! Handlers for the cargo commands and queries.

mod create_cargo;
mod fetch_cargo;
mod update_cargo_status;

use std::sync::Arc;

use cargo_store::{CargoRepository, StoreError};
use domain::Cargo;

pub use create_cargo::CreateCargoHandler;
pub use fetch_cargo::FetchCargoByIdHandler;
pub use update_cargo_status::UpdateCargoStatusHandler;

use crate::error::ApplicationError;
use crate::ports::{Clock, EventPublisher, IdProvider, VesselChecker};

/// Collaborators shared by every cargo handler.
#[derive(Clone)]
pub struct CargoServices {
    pub repository: Arc<dyn CargoRepository>,
    pub publisher: Arc<dyn EventPublisher>,
    pub vessels: Arc<dyn VesselChecker>,
    pub clock: Arc<dyn Clock>,
    pub ids: Arc<dyn IdProvider>,
}

impl CargoServices {
    /// Saves `cargo`, then publishes whatever events it recorded.
    ///
    /// Events are only published once the save has committed. A save the
    /// repository refuses as stale is a successful no-op: nothing is written
    /// and nothing is published.
    async fn save_and_publish(&self, cargo: &mut Cargo) -> Result<(), ApplicationError> {
        let cargo_id = cargo.id();
        match self.repository.save(cargo).await {
            Ok(()) => {}
            Err(StoreError::StaleWrite {
                stored, attempted, ..
            }) => {
                tracing::debug!(%cargo_id, %stored, %attempted, "stale cargo write ignored");
                return Ok(());
            }
            Err(source) => return Err(ApplicationError::store(cargo_id)(source)),
        }
        cargo.mark_persisted();

        let events = cargo.pull_events();
        if events.is_empty() {
            return Ok(());
        }

        let count = events.len();
        self.publisher.publish(events).await.map_err(|source| {
            tracing::error!(
                %cargo_id,
                error = %source,
                cause = %source.source,
                "cargo saved but events were not published"
            );
            ApplicationError::Publish { cargo_id, source }
        })?;
        metrics::counter!("cargo_events_published_total").increment(count as u64);

        Ok(())
    }
}
