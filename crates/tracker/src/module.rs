//! Handler registration for the cargo use cases.

use application::{
    ApplicationError, CargoServices, CreateCargo, CreateCargoHandler, FetchCargoById,
    FetchCargoByIdHandler, UpdateCargoStatus, UpdateCargoStatusHandler,
};
use bus::{BusBuilder, BusError};

/// Registers every cargo command on `commands` and every cargo query on
/// `queries`.
///
/// Any failure is a wiring defect and should abort start-up.
pub fn register_cargo_module(
    commands: &BusBuilder<ApplicationError>,
    queries: &BusBuilder<ApplicationError>,
    services: &CargoServices,
) -> Result<(), BusError> {
    commands.register::<CreateCargo, _>(CreateCargoHandler::new(services.clone()))?;
    commands.register::<UpdateCargoStatus, _>(UpdateCargoStatusHandler::new(services.clone()))?;
    queries.register::<FetchCargoById, _>(FetchCargoByIdHandler::new(services.clone()))?;

    tracing::info!("cargo module registered");
    Ok(())
}
