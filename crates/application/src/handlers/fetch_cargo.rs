use async_trait::async_trait;
use bus::{Context, Handler};
use cargo_store::FindOptions;
use common::CargoId;
use domain::CargoError;

use super::CargoServices;
use crate::error::ApplicationError;
use crate::queries::{CargoView, FetchCargoById};

pub struct FetchCargoByIdHandler {
    services: CargoServices,
}

impl FetchCargoByIdHandler {
    pub fn new(services: CargoServices) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Handler<FetchCargoById> for FetchCargoByIdHandler {
    type Output = CargoView;
    type Error = ApplicationError;

    #[tracing::instrument(skip_all, fields(cargo_id = %query.id, with_tracking = query.with_tracking))]
    async fn handle(
        &self,
        _ctx: &Context,
        query: FetchCargoById,
    ) -> Result<CargoView, ApplicationError> {
        let cargo_id = CargoId::parse(&query.id).map_err(|source| {
            ApplicationError::cargo(&query.id)(CargoError::InvalidIdentifier {
                field: "cargo",
                source,
            })
        })?;

        let options = FindOptions {
            with_tracking: query.with_tracking,
            include_deleted: false,
        };
        let cargo = self
            .services
            .repository
            .find(cargo_id, options)
            .await
            .map_err(ApplicationError::store(cargo_id))?;

        Ok(CargoView::from(&cargo))
    }
}
