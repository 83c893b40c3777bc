use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CargoId, TrackingId, VesselId};
use domain::{Cargo, CargoRecord, CargoStatus, EntryType, Item, TrackingEntry};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Result, StoreError,
    repository::{CargoRepository, FindOptions, check_write_order},
};

/// PostgreSQL-backed cargo repository.
///
/// Each save runs in its own transaction; dropping the transaction on an
/// early return rolls back everything written so far.
#[derive(Clone)]
pub struct PostgresCargoRepository {
    pool: PgPool,
}

impl PostgresCargoRepository {
    /// Creates a new PostgreSQL cargo repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Marks a stored cargo as deleted.
    pub async fn soft_delete(&self, id: CargoId, at: DateTime<Utc>) -> Result<()> {
        let deleted = sqlx::query(
            "UPDATE cargoes SET deleted_at = $2 WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id.as_uuid())
        .bind(at)
        .execute(&self.pool)
        .await?;

        if deleted.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn load_tracking(&self, id: CargoId) -> Result<Vec<TrackingEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, entry_type, status_before, status_after, created_at
            FROM cargoes_tracking
            WHERE cargo_id = $1
            ORDER BY seq ASC
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_entry).collect()
    }

    fn row_to_record(row: PgRow, tracking: Vec<TrackingEntry>) -> Result<CargoRecord> {
        let items: Vec<Item> = serde_json::from_value(row.try_get("items")?)?;
        let status: String = row.try_get("status")?;
        let status =
            CargoStatus::parse(&status).map_err(|e| StoreError::Decode(e.to_string()))?;

        Ok(CargoRecord {
            id: CargoId::from_uuid(row.try_get::<Uuid, _>("id")?),
            vessel_id: VesselId::from_uuid(row.try_get::<Uuid, _>("vessel_id")?),
            items,
            status,
            tracking,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            deleted_at: row.try_get("deleted_at")?,
        })
    }

    fn row_to_entry(row: PgRow) -> Result<TrackingEntry> {
        let entry_type: String = row.try_get("entry_type")?;
        let entry_type = EntryType::parse(&entry_type).ok_or_else(|| {
            StoreError::Decode(format!("unknown tracking entry type {entry_type:?}"))
        })?;

        Ok(TrackingEntry::restore(
            TrackingId::from_uuid(row.try_get::<Uuid, _>("id")?),
            entry_type,
            row.try_get("status_before")?,
            row.try_get("status_after")?,
            row.try_get("created_at")?,
        ))
    }
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

#[async_trait]
impl CargoRepository for PostgresCargoRepository {
    #[tracing::instrument(skip(self))]
    async fn find(&self, id: CargoId, options: FindOptions) -> Result<Cargo> {
        let row = sqlx::query(
            r#"
            SELECT id, vessel_id, items, status, created_at, updated_at, deleted_at
            FROM cargoes
            WHERE id = $1 AND ($2 OR deleted_at IS NULL)
            "#,
        )
        .bind(id.as_uuid())
        .bind(options.include_deleted)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound(id))?;

        let tracking = if options.with_tracking {
            self.load_tracking(id).await?
        } else {
            Vec::new()
        };

        Self::row_to_record(row, tracking).map(Cargo::restore)
    }

    #[tracing::instrument(skip(self, cargo), fields(cargo_id = %cargo.id(), new = cargo.is_new()))]
    async fn save(&self, cargo: &Cargo) -> Result<()> {
        let id = cargo.id();
        let items = serde_json::to_value(cargo.items())?;
        let pending = cargo.unpersisted_tracking();

        // Start a transaction
        let mut tx = self.pool.begin().await?;

        if cargo.is_new() {
            sqlx::query(
                r#"
                INSERT INTO cargoes (id, vessel_id, items, status, created_at, updated_at, deleted_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(id.as_uuid())
            .bind(cargo.vessel_id().as_uuid())
            .bind(&items)
            .bind(cargo.status().as_str())
            .bind(cargo.created_at())
            .bind(cargo.updated_at())
            .bind(cargo.deleted_at())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    return StoreError::AlreadyExists(id);
                }
                StoreError::Database(e)
            })?;
        } else {
            let stored: Option<DateTime<Utc>> = sqlx::query_scalar(
                "SELECT updated_at FROM cargoes WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
            )
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?;

            let stored = stored.ok_or(StoreError::NotFound(id))?;
            check_write_order(cargo, stored)?;

            sqlx::query(
                r#"
                UPDATE cargoes
                SET vessel_id = $2, items = $3, status = $4, updated_at = $5
                WHERE id = $1
                "#,
            )
            .bind(id.as_uuid())
            .bind(cargo.vessel_id().as_uuid())
            .bind(&items)
            .bind(cargo.status().as_str())
            .bind(cargo.updated_at())
            .execute(&mut *tx)
            .await?;
        }

        for entry in pending {
            sqlx::query(
                r#"
                INSERT INTO cargoes_tracking (cargo_id, id, entry_type, status_before, status_after, created_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(id.as_uuid())
            .bind(entry.id().as_uuid())
            .bind(entry.entry_type().as_str())
            .bind(entry.status_before())
            .bind(entry.status_after())
            .bind(entry.created_at())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    return StoreError::TrackingConflict {
                        cargo_id: id,
                        tracking_id: entry.id(),
                    };
                }
                StoreError::Database(e)
            })?;
        }

        tx.commit().await?;
        metrics::counter!("cargo_store_tracking_rows_written_total").increment(pending.len() as u64);

        Ok(())
    }
}
