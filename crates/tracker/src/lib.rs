//! Composition root for the cargo tracker.
//!
//! [`CargoTracker`] wires the cargo handlers onto a command bus and a query
//! bus. Status updates go through a [`BlockingBus`] so that concurrent
//! updates of one cargo, from this process or any other sharing the lock
//! service, are applied one at a time.

pub mod config;
pub mod error;
pub mod locks;
pub mod module;
pub mod telemetry;

use std::sync::Arc;

use application::ports::{EventPublisher, SystemClock, UuidV7Provider, VesselChecker};
use application::{
    ApplicationError, CargoServices, CargoView, CreateCargo, FetchCargoById, UpdateCargoStatus,
};
use bus::{BlockingBus, Bus, BusBuilder, Context, InMemoryLockService, LockService, LockSettings};
use cargo_store::{InMemoryCargoRepository, PostgresCargoRepository, PostgresLockService};
use sqlx::postgres::PgPoolOptions;

pub use config::{Config, LogFormat};
pub use error::{ErrorKind, TrackerError};
pub use locks::ConfiguredLocks;
pub use module::register_cargo_module;

/// Entry point for creating, moving and reading cargo.
pub struct CargoTracker<L> {
    commands: BlockingBus<L, ApplicationError>,
    queries: Bus<ApplicationError>,
}

impl<L> Clone for CargoTracker<L> {
    fn clone(&self) -> Self {
        Self {
            commands: self.commands.clone(),
            queries: self.queries.clone(),
        }
    }
}

impl<L: LockService> CargoTracker<L> {
    /// Registers the cargo module over `services`, serializing updates
    /// through `locks`.
    pub fn with_services(services: CargoServices, locks: Arc<L>) -> Result<Self, TrackerError> {
        let commands = BusBuilder::new();
        let queries = BusBuilder::new();
        register_cargo_module(&commands, &queries, &services)?;

        Ok(Self {
            commands: BlockingBus::new(commands.build(), locks),
            queries: queries.build(),
        })
    }

    /// Creates a pending cargo.
    pub async fn create_cargo(
        &self,
        ctx: &Context,
        command: CreateCargo,
    ) -> Result<(), TrackerError> {
        self.commands.bus().dispatch(ctx, command).await?;
        Ok(())
    }

    /// Moves a cargo to a new status while holding its blocking key.
    pub async fn update_cargo_status(
        &self,
        ctx: &Context,
        command: UpdateCargoStatus,
    ) -> Result<(), TrackerError> {
        self.commands.dispatch_blocking(ctx, command).await?;
        Ok(())
    }

    pub async fn fetch_cargo(
        &self,
        ctx: &Context,
        query: FetchCargoById,
    ) -> Result<CargoView, TrackerError> {
        Ok(self.queries.ask(ctx, query).await?)
    }

    pub fn commands(&self) -> &BlockingBus<L, ApplicationError> {
        &self.commands
    }

    pub fn queries(&self) -> &Bus<ApplicationError> {
        &self.queries
    }
}

fn services(
    repository: Arc<dyn cargo_store::CargoRepository>,
    vessels: Arc<dyn VesselChecker>,
    publisher: Arc<dyn EventPublisher>,
) -> CargoServices {
    CargoServices {
        repository,
        publisher,
        vessels,
        clock: Arc::new(SystemClock),
        ids: Arc::new(UuidV7Provider),
    }
}

impl CargoTracker<InMemoryLockService> {
    /// Single-process tracker with in-memory storage and locks.
    pub fn in_memory(
        settings: LockSettings,
        vessels: Arc<dyn VesselChecker>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Result<Self, TrackerError> {
        let repository = Arc::new(InMemoryCargoRepository::new());
        Self::with_services(
            services(repository, vessels, publisher),
            Arc::new(InMemoryLockService::new(settings)),
        )
    }
}

impl CargoTracker<PostgresLockService> {
    /// Connects to PostgreSQL, runs migrations and wires the PostgreSQL
    /// repository and lock service.
    #[tracing::instrument(skip_all)]
    pub async fn connect(
        config: &Config,
        vessels: Arc<dyn VesselChecker>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Result<Self, TrackerError> {
        let url = config
            .database_url
            .as_deref()
            .ok_or(TrackerError::MissingDatabaseUrl)?;
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect(url)
            .await?;

        let repository = PostgresCargoRepository::new(pool.clone());
        repository.run_migrations().await?;
        tracing::info!("database migrations applied");

        Self::with_services(
            services(Arc::new(repository), vessels, publisher),
            Arc::new(PostgresLockService::new(pool, config.lock)),
        )
    }
}

impl CargoTracker<ConfiguredLocks> {
    /// Builds a tracker on PostgreSQL when `DATABASE_URL` is configured and
    /// on in-memory storage otherwise.
    pub async fn from_config(
        config: &Config,
        vessels: Arc<dyn VesselChecker>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Result<Self, TrackerError> {
        if config.database_url.is_none() {
            tracing::warn!("DATABASE_URL not set; cargo is kept in memory only");
            let locks = ConfiguredLocks::InMemory(InMemoryLockService::new(config.lock));
            let repository = Arc::new(InMemoryCargoRepository::new());
            return Self::with_services(services(repository, vessels, publisher), Arc::new(locks));
        }

        let connected =
            CargoTracker::<PostgresLockService>::connect(config, vessels, publisher).await?;
        let locks = ConfiguredLocks::Postgres(connected.commands.locks().as_ref().clone());

        Ok(Self {
            commands: BlockingBus::new(connected.commands.bus().clone(), Arc::new(locks)),
            queries: connected.queries,
        })
    }
}
