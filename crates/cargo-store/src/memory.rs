use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::CargoId;
use domain::{Cargo, CargoRecord};
use tokio::sync::RwLock;

use crate::{
    Result, StoreError,
    repository::{CargoRepository, FindOptions, check_write_order},
};

/// In-memory cargo repository for tests and single-process use.
///
/// Every check of a save is staged before anything is written, so a failed
/// save leaves the previously stored state visible.
#[derive(Clone, Default)]
pub struct InMemoryCargoRepository {
    cargoes: Arc<RwLock<HashMap<CargoId, CargoRecord>>>,
}

impl InMemoryCargoRepository {
    /// Creates a new empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored cargo, soft-deleted included.
    pub async fn cargo_count(&self) -> usize {
        self.cargoes.read().await.len()
    }

    /// Marks a stored cargo as deleted. It stays readable through
    /// [`FindOptions::include_deleted`].
    pub async fn soft_delete(&self, id: CargoId, at: DateTime<Utc>) -> Result<()> {
        let mut store = self.cargoes.write().await;
        match store.get_mut(&id) {
            Some(record) if record.deleted_at.is_none() => {
                record.deleted_at = Some(at);
                Ok(())
            }
            _ => Err(StoreError::NotFound(id)),
        }
    }
}

#[async_trait]
impl CargoRepository for InMemoryCargoRepository {
    async fn find(&self, id: CargoId, options: FindOptions) -> Result<Cargo> {
        let store = self.cargoes.read().await;
        let record = store
            .get(&id)
            .filter(|record| options.include_deleted || record.deleted_at.is_none())
            .ok_or(StoreError::NotFound(id))?;

        let mut record = record.clone();
        if !options.with_tracking {
            record.tracking.clear();
        }

        Ok(Cargo::restore(record))
    }

    async fn save(&self, cargo: &Cargo) -> Result<()> {
        let id = cargo.id();
        let mut store = self.cargoes.write().await;
        let existing = store.get(&id);

        match existing {
            Some(_) if cargo.is_new() => return Err(StoreError::AlreadyExists(id)),
            None if cargo.is_new() => {}
            Some(record) if record.deleted_at.is_none() => {
                check_write_order(cargo, record.updated_at)?;
            }
            _ => return Err(StoreError::NotFound(id)),
        }

        let mut tracking = existing
            .map(|record| record.tracking.clone())
            .unwrap_or_default();
        for entry in cargo.unpersisted_tracking() {
            if tracking.iter().any(|stored| stored.id() == entry.id()) {
                return Err(StoreError::TrackingConflict {
                    cargo_id: id,
                    tracking_id: entry.id(),
                });
            }
            tracking.push(entry.clone());
        }

        store.insert(
            id,
            CargoRecord {
                id,
                vessel_id: cargo.vessel_id(),
                items: cargo.items().as_slice().to_vec(),
                status: cargo.status(),
                tracking,
                created_at: cargo.created_at(),
                updated_at: cargo.updated_at(),
                deleted_at: cargo.deleted_at(),
            },
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use common::{TrackingId, VesselId};
    use domain::{CargoStatus, Item, UpdateOption};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn new_cargo() -> Cargo {
        Cargo::create(
            &CargoId::generate().to_string(),
            &VesselId::generate().to_string(),
            vec![Item::new("Fuel", 100), Item::new("Supplies", 50)],
            &TrackingId::generate().to_string(),
            t0(),
        )
        .unwrap()
    }

    fn move_to(cargo: &mut Cargo, tracking_id: &str, status: &str, minutes: i64) {
        let at = t0() + Duration::minutes(minutes);
        cargo
            .apply_update(at, [UpdateOption::with_status(tracking_id, status, at)])
            .unwrap();
    }

    #[tokio::test]
    async fn test_save_and_find_with_tracking() {
        let repo = InMemoryCargoRepository::new();
        let cargo = new_cargo();
        repo.save(&cargo).await.unwrap();

        let found = repo
            .find(cargo.id(), FindOptions::new().with_tracking())
            .await
            .unwrap();

        assert_eq!(found.id(), cargo.id());
        assert_eq!(found.vessel_id(), cargo.vessel_id());
        assert_eq!(found.weight(), 150);
        assert_eq!(found.status(), CargoStatus::Pending);
        assert_eq!(found.tracking(), cargo.tracking());
        assert!(!found.is_new());
    }

    #[tokio::test]
    async fn test_find_without_tracking_has_empty_ledger() {
        let repo = InMemoryCargoRepository::new();
        let cargo = new_cargo();
        repo.save(&cargo).await.unwrap();

        let found = repo.find(cargo.id(), FindOptions::new()).await.unwrap();
        assert!(found.tracking().is_empty());
    }

    #[tokio::test]
    async fn test_find_missing_cargo() {
        let repo = InMemoryCargoRepository::new();
        let id = CargoId::generate();

        let result = repo.find(id, FindOptions::new()).await;
        assert!(matches!(result, Err(StoreError::NotFound(missing)) if missing == id));
    }

    #[tokio::test]
    async fn test_new_cargo_saved_twice_conflicts() {
        let repo = InMemoryCargoRepository::new();
        let cargo = new_cargo();
        repo.save(&cargo).await.unwrap();

        let result = repo.save(&cargo).await;
        assert!(matches!(result, Err(StoreError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_update_appends_only_new_entries() {
        let repo = InMemoryCargoRepository::new();
        let cargo = new_cargo();
        repo.save(&cargo).await.unwrap();

        let mut loaded = repo.find(cargo.id(), FindOptions::new()).await.unwrap();
        move_to(&mut loaded, &TrackingId::generate().to_string(), "in_transit", 1);
        repo.save(&loaded).await.unwrap();

        let found = repo
            .find(cargo.id(), FindOptions::new().with_tracking())
            .await
            .unwrap();
        assert_eq!(found.status(), CargoStatus::InTransit);
        assert_eq!(found.tracking().len(), 2);
        assert_eq!(found.updated_at(), t0() + Duration::minutes(1));
    }

    #[tokio::test]
    async fn test_failed_ledger_write_rolls_back_root() {
        let repo = InMemoryCargoRepository::new();
        let cargo = new_cargo();
        repo.save(&cargo).await.unwrap();

        // reuse the created entry's id so the ledger write collides
        let reused = cargo.tracking().as_slice()[0].id().to_string();
        let mut loaded = repo.find(cargo.id(), FindOptions::new()).await.unwrap();
        move_to(&mut loaded, &reused, "in_transit", 1);

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
    async fn test_soft_deleted_cargo_is_hidden_by_default() {
        let repo = InMemoryCargoRepository::new();
        let cargo = new_cargo();
        repo.save(&cargo).await.unwrap();
        repo.soft_delete(cargo.id(), t0()).await.unwrap();

        let hidden = repo.find(cargo.id(), FindOptions::new()).await;
        assert!(matches!(hidden, Err(StoreError::NotFound(_))));

        let found = repo
            .find(cargo.id(), FindOptions::new().include_deleted())
            .await
            .unwrap();
        assert!(found.is_deleted());
        assert_eq!(repo.cargo_count().await, 1);
    }

    #[tokio::test]
    async fn test_saving_over_soft_deleted_cargo_is_not_found() {
        let repo = InMemoryCargoRepository::new();
        let cargo = new_cargo();
        repo.save(&cargo).await.unwrap();

        let mut loaded = repo.find(cargo.id(), FindOptions::new()).await.unwrap();
        repo.soft_delete(cargo.id(), t0()).await.unwrap();
        move_to(&mut loaded, &TrackingId::generate().to_string(), "in_transit", 1);

        let result = repo.save(&loaded).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_older_write_never_overwrites_newer_one() {
        let repo = InMemoryCargoRepository::new();
        let cargo = new_cargo();
        repo.save(&cargo).await.unwrap();

        let mut first = repo.find(cargo.id(), FindOptions::new()).await.unwrap();
        let mut second = first.clone();
        move_to(&mut first, &TrackingId::generate().to_string(), "in_transit", 2);
        move_to(&mut second, &TrackingId::generate().to_string(), "in_transit", 1);

        repo.save(&first).await.unwrap();
        let result = repo.save(&second).await;
        assert!(matches!(
            result,
            Err(StoreError::StaleWrite { stored, attempted, .. })
                if stored == t0() + Duration::minutes(2)
                    && attempted == t0() + Duration::minutes(1)
        ));
        assert!(result.unwrap_err().is_stale());

        let found = repo
            .find(cargo.id(), FindOptions::new().with_tracking())
            .await
            .unwrap();
        assert_eq!(found.updated_at(), t0() + Duration::minutes(2));
        assert_eq!(found.tracking().len(), 2);
    }

    #[tokio::test]
    async fn test_write_from_outdated_copy_conflicts() {
        let repo = InMemoryCargoRepository::new();
        let cargo = new_cargo();
        repo.save(&cargo).await.unwrap();

        let mut first = repo.find(cargo.id(), FindOptions::new()).await.unwrap();
        let mut second = first.clone();
        move_to(&mut first, &TrackingId::generate().to_string(), "in_transit", 1);
        move_to(&mut second, &TrackingId::generate().to_string(), "in_transit", 2);

        repo.save(&first).await.unwrap();
        let result = repo.save(&second).await;
        assert!(matches!(
            result,
            Err(StoreError::ConcurrencyConflict { expected, actual, .. })
                if expected == t0() && actual == t0() + Duration::minutes(1)
        ));

        let found = repo
            .find(cargo.id(), FindOptions::new().with_tracking())
            .await
            .unwrap();
        assert_eq!(found.updated_at(), t0() + Duration::minutes(1));
        assert_eq!(found.tracking().len(), 2);
    }

    #[tokio::test]
    async fn test_saved_copy_can_be_saved_again_after_more_changes() {
        let repo = InMemoryCargoRepository::new();
        let mut cargo = new_cargo();
        repo.save(&cargo).await.unwrap();
        cargo.mark_persisted();

        move_to(&mut cargo, &TrackingId::generate().to_string(), "in_transit", 1);
        repo.save(&cargo).await.unwrap();
        cargo.mark_persisted();

        move_to(&mut cargo, &TrackingId::generate().to_string(), "delivered", 2);
        repo.save(&cargo).await.unwrap();

        let found = repo
            .find(cargo.id(), FindOptions::new().with_tracking())
            .await
            .unwrap();
        assert_eq!(found.status(), CargoStatus::Delivered);
        assert_eq!(found.tracking().len(), 3);
    }
}
