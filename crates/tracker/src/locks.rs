//! Lock backend chosen at start-up.

use async_trait::async_trait;
use bus::{InMemoryLockService, Lease, LockError, LockService};
use cargo_store::PostgresLockService;

/// Either lock service, so a tracker built from configuration has one
/// concrete type whichever storage it uses.
#[derive(Clone)]
pub enum ConfiguredLocks {
    InMemory(InMemoryLockService),
    Postgres(PostgresLockService),
}

#[async_trait]
impl LockService for ConfiguredLocks {
    async fn acquire(&self, key: &str) -> Result<Lease, LockError> {
        match self {
            ConfiguredLocks::InMemory(locks) => locks.acquire(key).await,
            ConfiguredLocks::Postgres(locks) => locks.acquire(key).await,
        }
    }

    async fn release(&self, lease: Lease) -> Result<(), LockError> {
        match self {
            ConfiguredLocks::InMemory(locks) => locks.release(lease).await,
            ConfiguredLocks::Postgres(locks) => locks.release(lease).await,
        }
    }
}
