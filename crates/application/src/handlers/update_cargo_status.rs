use async_trait::async_trait;
use bus::{Context, Handler};
use cargo_store::FindOptions;
use common::CargoId;
use domain::{CargoError, UpdateOption};

use super::CargoServices;
use crate::commands::UpdateCargoStatus;
use crate::error::ApplicationError;

/// Moves a cargo through its lifecycle.
///
/// Meant to be dispatched through a `BlockingBus` so that updates to the same
/// cargo are serialized. Requests that change nothing, either because the
/// status is already current or because the request is stale, succeed
/// without writing.
pub struct UpdateCargoStatusHandler {
    services: CargoServices,
}

impl UpdateCargoStatusHandler {
    pub fn new(services: CargoServices) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Handler<UpdateCargoStatus> for UpdateCargoStatusHandler {
    type Output = ();
    type Error = ApplicationError;

    #[tracing::instrument(skip_all, fields(cargo_id = %command.id, new_status = %command.new_status))]
    async fn handle(
        &self,
        _ctx: &Context,
        command: UpdateCargoStatus,
    ) -> Result<(), ApplicationError> {
        let cargo_id = CargoId::parse(&command.id).map_err(|source| {
            ApplicationError::cargo(&command.id)(CargoError::InvalidIdentifier {
                field: "cargo",
                source,
            })
        })?;

        // deleted cargo is loaded so the aggregate can refuse it as not modifiable
        let mut cargo = self
            .services
            .repository
            .find(cargo_id, FindOptions::new().include_deleted())
            .await
            .map_err(ApplicationError::store(cargo_id))?;

        let now = self.services.clock.now();
        let option = UpdateOption::with_status(self.services.ids.new_id(), command.new_status, now);
        cargo
            .apply_update(now, [option])
            .map_err(ApplicationError::cargo(&command.id))?;

        if cargo.unpersisted_tracking().is_empty() {
            tracing::debug!(status = %cargo.status(), "status update changed nothing");
            return Ok(());
        }

        self.services.save_and_publish(&mut cargo).await?;
        tracing::info!(status = %cargo.status(), "cargo status updated");

        Ok(())
    }
}
