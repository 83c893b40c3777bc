use async_trait::async_trait;
use bus::{Context, Handler};
use cargo_store::{FindOptions, StoreError};
use common::{CargoId, VesselId};
use domain::{Cargo, CargoError};

use super::CargoServices;
use crate::commands::{CreateCargo, ItemInput};
use crate::error::ApplicationError;

/// Creates a cargo after checking that its vessel exists and that the id is
/// not taken.
pub struct CreateCargoHandler {
    services: CargoServices,
}

impl CreateCargoHandler {
    pub fn new(services: CargoServices) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Handler<CreateCargo> for CreateCargoHandler {
    type Output = ();
    type Error = ApplicationError;

    #[tracing::instrument(skip_all, fields(cargo_id = %command.id, vessel_id = %command.vessel_id))]
    async fn handle(&self, _ctx: &Context, command: CreateCargo) -> Result<(), ApplicationError> {
        let cargo_id = CargoId::parse(&command.id).map_err(|source| {
            ApplicationError::cargo(&command.id)(CargoError::InvalidIdentifier {
                field: "cargo",
                source,
            })
        })?;
        let vessel_id = VesselId::parse(&command.vessel_id).map_err(|source| {
            ApplicationError::cargo(&command.id)(CargoError::InvalidIdentifier {
                field: "vessel",
                source,
            })
        })?;

        let known = self
            .services
            .vessels
            .exists(vessel_id)
            .await
            .map_err(|source| ApplicationError::VesselLookup { vessel_id, source })?;
        if !known {
            return Err(ApplicationError::VesselNotFound { vessel_id });
        }

        // soft-deleted cargo still owns its id
        match self
            .services
            .repository
            .find(cargo_id, FindOptions::new().include_deleted())
            .await
        {
            Ok(_) => {
                return Err(ApplicationError::store(cargo_id)(StoreError::AlreadyExists(
                    cargo_id,
                )));
            }
            Err(StoreError::NotFound(_)) => {}
            Err(source) => return Err(ApplicationError::store(cargo_id)(source)),
        }

        let items = command.items.into_iter().map(ItemInput::into_item).collect();
        let mut cargo = Cargo::create(
            &command.id,
            &command.vessel_id,
            items,
            &self.services.ids.new_id(),
            self.services.clock.now(),
        )
        .map_err(ApplicationError::cargo(&command.id))?;

        self.services.save_and_publish(&mut cargo).await?;

        metrics::counter!("cargo_created_total").increment(1);
        tracing::info!(weight = cargo.weight(), "cargo created");

        Ok(())
    }
}
