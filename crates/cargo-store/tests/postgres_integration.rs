//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency. Every test
//! works on freshly generated ids, so they do not interfere with each other.
//! Run with:
//!
//! ```bash
//! cargo test -p cargo-store --test postgres_integration
//! ```

use std::sync::Arc;
use std::time::Duration;

use bus::{LockError, LockService, LockSettings};
use cargo_store::{
    CargoRepository, FindOptions, PostgresCargoRepository, PostgresLockService, StoreError,
};
use chrono::{DateTime, TimeZone, Utc};
use common::{CargoId, TrackingId, VesselId};
use domain::{Cargo, CargoStatus, EntryType, Item, UpdateOption};
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            // Create a temporary pool just for migrations
            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            // Run migrations using raw_sql to execute multiple statements
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_cargoes_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/002_create_distributed_locks.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh pool for each test to avoid connection issues
async fn get_test_pool() -> PgPool {
    let info = get_container_info().await;

    sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap()
}

async fn get_test_repository() -> PostgresCargoRepository {
    PostgresCargoRepository::new(get_test_pool().await)
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
}

fn minutes(n: i64) -> DateTime<Utc> {
    t0() + chrono::Duration::minutes(n)
}

fn create_test_cargo() -> Cargo {
    Cargo::create(
        &CargoId::generate().to_string(),
        &VesselId::generate().to_string(),
        vec![Item::new("Fuel", 100), Item::new("Supplies", 50)],
        &TrackingId::generate().to_string(),
        t0(),
    )
    .unwrap()
}

fn move_to(cargo: &mut Cargo, tracking_id: &str, status: &str, at: DateTime<Utc>) {
    cargo
        .apply_update(at, [UpdateOption::with_status(tracking_id, status, at)])
        .unwrap();
}

#[tokio::test]
async fn save_and_find_cargo_with_tracking() {
    let repo = get_test_repository().await;
    let cargo = create_test_cargo();

    repo.save(&cargo).await.unwrap();

    let found = repo
        .find(cargo.id(), FindOptions::new().with_tracking())
        .await
        .unwrap();
    assert_eq!(found.id(), cargo.id());
    assert_eq!(found.vessel_id(), cargo.vessel_id());
    assert_eq!(found.items(), cargo.items());
    assert_eq!(found.status(), CargoStatus::Pending);
    assert_eq!(found.created_at(), t0());
    assert_eq!(found.updated_at(), t0());
    assert_eq!(found.tracking(), cargo.tracking());
    assert!(!found.is_new());
    assert!(found.unpersisted_tracking().is_empty());
}

#[tokio::test]
async fn find_without_tracking_skips_ledger() {
    let repo = get_test_repository().await;
    let cargo = create_test_cargo();
    repo.save(&cargo).await.unwrap();

    let found = repo.find(cargo.id(), FindOptions::new()).await.unwrap();
    assert!(found.tracking().is_empty());
    assert_eq!(found.weight(), 150);
}

#[tokio::test]
async fn find_unknown_cargo_is_not_found() {
    let repo = get_test_repository().await;

    let result = repo.find(CargoId::generate(), FindOptions::new()).await;
    assert!(matches!(result, Err(StoreError::NotFound(_))));
}

#[tokio::test]
async fn inserting_existing_cargo_conflicts() {
    let repo = get_test_repository().await;
    let cargo = create_test_cargo();
    repo.save(&cargo).await.unwrap();

    let result = repo.save(&cargo).await;
    assert!(matches!(result, Err(StoreError::AlreadyExists(id)) if id == cargo.id()));
}

#[tokio::test]
async fn full_lifecycle_keeps_ledger_in_order() {
    let repo = get_test_repository().await;
    let cargo = create_test_cargo();
    repo.save(&cargo).await.unwrap();

    for (step, status) in ["in_transit", "delivered"].into_iter().enumerate() {
        let mut loaded = repo.find(cargo.id(), FindOptions::new()).await.unwrap();
        let at = minutes(step as i64 + 1);
        move_to(&mut loaded, &TrackingId::generate().to_string(), status, at);
        repo.save(&loaded).await.unwrap();
    }

    let found = repo
        .find(cargo.id(), FindOptions::new().with_tracking())
        .await
        .unwrap();
    assert_eq!(found.status(), CargoStatus::Delivered);
    assert_eq!(found.updated_at(), minutes(2));

    let entries = found.tracking().as_slice();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].entry_type(), EntryType::Created);
    assert_eq!(entries[1].status_before(), Some("pending"));
    assert_eq!(entries[1].status_after(), Some("in_transit"));
    assert_eq!(entries[2].status_before(), Some("in_transit"));
    assert_eq!(entries[2].status_after(), Some("delivered"));
}

#[tokio::test]
async fn failed_ledger_insert_rolls_back_root_update() {
    let repo = get_test_repository().await;
    let cargo = create_test_cargo();
    repo.save(&cargo).await.unwrap();

    // reuse the created entry's id so the ledger insert violates the key
    let reused = cargo.tracking().as_slice()[0].id().to_string();
    let mut loaded = repo.find(cargo.id(), FindOptions::new()).await.unwrap();
    move_to(&mut loaded, &reused, "in_transit", minutes(1));

    let result = repo.save(&loaded).await;
    assert!(matches!(result, Err(StoreError::TrackingConflict { .. })));

    let found = repo
        .find(cargo.id(), FindOptions::new().with_tracking())
        .await
        .unwrap();
    assert_eq!(found.status(), CargoStatus::Pending);
    assert_eq!(found.updated_at(), t0());
    assert_eq!(found.tracking().len(), 1);
}

#[tokio::test]
async fn soft_deleted_cargo_is_excluded_by_default() {
    let repo = get_test_repository().await;
    let cargo = create_test_cargo();
    repo.save(&cargo).await.unwrap();
    repo.soft_delete(cargo.id(), minutes(5)).await.unwrap();

    let hidden = repo.find(cargo.id(), FindOptions::new()).await;
    assert!(matches!(hidden, Err(StoreError::NotFound(_))));

    let found = repo
        .find(cargo.id(), FindOptions::new().include_deleted())
        .await
        .unwrap();
    assert_eq!(found.deleted_at(), Some(minutes(5)));
}

#[tokio::test]
async fn updating_soft_deleted_cargo_is_not_found() {
    let repo = get_test_repository().await;
    let cargo = create_test_cargo();
    repo.save(&cargo).await.unwrap();

    let mut loaded = repo.find(cargo.id(), FindOptions::new()).await.unwrap();
    repo.soft_delete(cargo.id(), minutes(1)).await.unwrap();
    move_to(&mut loaded, &TrackingId::generate().to_string(), "in_transit", minutes(2));

    let result = repo.save(&loaded).await;
    assert!(matches!(result, Err(StoreError::NotFound(_))));
}

#[tokio::test]
async fn older_write_is_rejected_without_touching_newer_state() {
    let repo = get_test_repository().await;
    let cargo = create_test_cargo();
    repo.save(&cargo).await.unwrap();

    let mut first = repo.find(cargo.id(), FindOptions::new()).await.unwrap();
    let mut second = repo.find(cargo.id(), FindOptions::new()).await.unwrap();
    move_to(&mut first, &TrackingId::generate().to_string(), "in_transit", minutes(2));
    move_to(&mut second, &TrackingId::generate().to_string(), "in_transit", minutes(1));

    repo.save(&first).await.unwrap();
    let result = repo.save(&second).await;
    assert!(matches!(result, Err(StoreError::StaleWrite { stored, .. }) if stored == minutes(2)));

    let found = repo
        .find(cargo.id(), FindOptions::new().with_tracking())
        .await
        .unwrap();
    assert_eq!(found.updated_at(), minutes(2));
    let transitions: Vec<_> = found
        .tracking()
        .iter()
        .map(|e| (e.status_before(), e.status_after()))
        .collect();
    assert_eq!(
        transitions,
        vec![
            (Some("pending"), Some("pending")),
            (Some("pending"), Some("in_transit")),
        ]
    );
}

#[tokio::test]
async fn newer_write_from_outdated_copy_conflicts() {
    let repo = get_test_repository().await;
    let cargo = create_test_cargo();
    repo.save(&cargo).await.unwrap();

    let mut first = repo.find(cargo.id(), FindOptions::new()).await.unwrap();
    let mut second = repo.find(cargo.id(), FindOptions::new()).await.unwrap();
    move_to(&mut first, &TrackingId::generate().to_string(), "in_transit", minutes(1));
    move_to(&mut second, &TrackingId::generate().to_string(), "in_transit", minutes(2));

    repo.save(&first).await.unwrap();
    let result = repo.save(&second).await;
    assert!(matches!(
        result,
        Err(StoreError::ConcurrencyConflict { expected, actual, .. })
            if expected == t0() && actual == minutes(1)
    ));

    let found = repo
        .find(cargo.id(), FindOptions::new().with_tracking())
        .await
        .unwrap();
    assert_eq!(found.updated_at(), minutes(1));
    assert_eq!(found.tracking().len(), 2);
}

fn lock_settings() -> LockSettings {
    LockSettings {
        lease_ttl: Duration::from_secs(10),
        wait_timeout: Duration::from_millis(200),
        retry_interval: Duration::from_millis(20),
    }
}

fn unique_key() -> String {
    format!("cargo_update:{}", CargoId::generate())
}

#[tokio::test]
async fn lock_acquire_release_cycle() {
    let locks = PostgresLockService::new(get_test_pool().await, lock_settings());
    let key = unique_key();

    let lease = locks.acquire(&key).await.unwrap();
    assert_eq!(lease.key(), key);
    locks.release(lease).await.unwrap();

    let again = locks.acquire(&key).await.unwrap();
    locks.release(again).await.unwrap();
}

#[tokio::test]
async fn held_lock_is_busy_for_other_instances() {
    let pool = get_test_pool().await;
    let first = PostgresLockService::new(pool.clone(), lock_settings());
    let second = PostgresLockService::new(pool, lock_settings());
    let key = unique_key();

    let _lease = first.acquire(&key).await.unwrap();

    let result = second.acquire(&key).await;
    assert!(matches!(result, Err(LockError::Busy { .. })));
}

#[tokio::test]
async fn expired_lock_is_taken_over() {
    let locks = PostgresLockService::new(
        get_test_pool().await,
        LockSettings {
            lease_ttl: Duration::from_millis(100),
            ..lock_settings()
        },
    );
    let key = unique_key();

    let stale = locks.acquire(&key).await.unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;

    let fresh = locks.acquire(&key).await.unwrap();
    assert_ne!(stale.token(), fresh.token());

    let result = locks.release(stale).await;
    assert!(matches!(result, Err(LockError::LeaseLost { .. })));
    locks.release(fresh).await.unwrap();
}

#[tokio::test]
async fn abandoned_acquire_does_not_leave_key_locked() {
    let pool = get_test_pool().await;
    let locks = PostgresLockService::new(pool.clone(), lock_settings());
    let key = unique_key();

    // an uncommitted, already expired row makes the upsert wait on it
    let mut blocker = pool.begin().await.unwrap();
    sqlx::query(
        "INSERT INTO distributed_locks (key, token, expires_at) VALUES ($1, $2, now() - interval '1 second')",
    )
    .bind(&key)
    .bind(uuid::Uuid::new_v4())
    .execute(&mut *blocker)
    .await
    .unwrap();

    let attempt = tokio::time::timeout(Duration::from_millis(200), locks.acquire(&key)).await;
    assert!(attempt.is_err());
    blocker.commit().await.unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    let other = PostgresLockService::new(
        pool,
        LockSettings {
            wait_timeout: Duration::from_secs(2),
            ..lock_settings()
        },
    );
    let lease = other.acquire(&key).await.unwrap();
    other.release(lease).await.unwrap();
}
