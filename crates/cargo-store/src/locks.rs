//! Lock service backed by the `distributed_locks` table.

use async_trait::async_trait;
use bus::lock::poll_until_acquired;
use bus::{Lease, LockError, LockService, LockSettings};
use sqlx::PgPool;
use tokio::time::Instant;
use uuid::Uuid;

/// Leased locks shared by every process connected to the same database.
///
/// A key is free when it has no row or its row has expired; acquiring an
/// expired key replaces the previous owner's token.
#[derive(Clone)]
pub struct PostgresLockService {
    pool: PgPool,
    settings: LockSettings,
}

impl PostgresLockService {
    pub fn new(pool: PgPool, settings: LockSettings) -> Self {
        Self { pool, settings }
    }

    async fn try_acquire(&self, key: &str) -> Result<Option<Lease>, LockError> {
        // taken before the statement runs so the local expiry is never later
        // than the one the database records
        let issued_at = Instant::now();
        let mut attempt = PendingAcquire::new(self.pool.clone(), key, Uuid::new_v4());

        let mut tx = self.pool.begin().await.map_err(unavailable(key))?;
        let token: Option<Uuid> = sqlx::query_scalar(
            r#"
            INSERT INTO distributed_locks (key, token, expires_at)
            VALUES ($1, $2, now() + make_interval(secs => $3))
            ON CONFLICT (key) DO UPDATE
                SET token = EXCLUDED.token, expires_at = EXCLUDED.expires_at
                WHERE distributed_locks.expires_at <= now()
            RETURNING token
            "#,
        )
        .bind(key)
        .bind(attempt.token)
        .bind(self.settings.lease_ttl.as_secs_f64())
        .fetch_optional(&mut *tx)
        .await
        .map_err(unavailable(key))?;
        tx.commit().await.map_err(unavailable(key))?;
        attempt.settle();

        Ok(token.map(|token| Lease::new(key, token, issued_at, self.settings.lease_ttl)))
    }
}

/// An acquisition whose outcome the caller has not seen yet.
///
/// The upsert runs in its own transaction, so a caller that drops the
/// acquiring future before the commit is sent leaves nothing behind. Once the
/// commit is on the wire the row may land under a token nobody holds;
/// dropping an unsettled attempt deletes that row so the key is not blocked
/// until it expires.
struct PendingAcquire {
    pool: PgPool,
    key: String,
    token: Uuid,
    settled: bool,
}

impl PendingAcquire {
    fn new(pool: PgPool, key: &str, token: Uuid) -> Self {
        Self {
            pool,
            key: key.to_string(),
            token,
            settled: false,
        }
    }

    fn settle(&mut self) {
        self.settled = true;
    }
}

impl Drop for PendingAcquire {
    fn drop(&mut self) {
        if self.settled {
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(key = %self.key, "abandoned lock attempt outside a runtime; left to expire");
            return;
        };

        let pool = self.pool.clone();
        let key = std::mem::take(&mut self.key);
        let token = self.token;
        runtime.spawn(async move {
            let cleared = sqlx::query("DELETE FROM distributed_locks WHERE key = $1 AND token = $2")
                .bind(&key)
                .bind(token)
                .execute(&pool)
                .await;
            match cleared {
                Ok(done) if done.rows_affected() > 0 => {
                    tracing::debug!(%key, "cleared lock row of an abandoned attempt");
                }
                Ok(_) => {}
                Err(error) => tracing::warn!(%key, %error, "failed to clear abandoned lock attempt"),
            }
        });
    }
}

fn unavailable(key: &str) -> impl FnOnce(sqlx::Error) -> LockError {
    let key = key.to_string();
    move |source| LockError::Unavailable {
        key,
        source: Box::new(source),
    }
}

#[async_trait]
impl LockService for PostgresLockService {
    #[tracing::instrument(skip(self))]
    async fn acquire(&self, key: &str) -> Result<Lease, LockError> {
        poll_until_acquired(key, &self.settings, || self.try_acquire(key)).await
    }

    #[tracing::instrument(skip(self, lease), fields(key = lease.key()))]
    async fn release(&self, lease: Lease) -> Result<(), LockError> {
        let released = sqlx::query("DELETE FROM distributed_locks WHERE key = $1 AND token = $2")
            .bind(lease.key())
            .bind(lease.token())
            .execute(&self.pool)
            .await
            .map_err(unavailable(lease.key()))?;

        if released.rows_affected() == 0 {
            return Err(LockError::LeaseLost {
                key: lease.key().to_string(),
            });
        }
        Ok(())
    }
}
