//! Distributed lock port and an in-process implementation.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use uuid::Uuid;

/// Proof of ownership of a key, returned by [`LockService::acquire`].
///
/// A lease is only good until [`Lease::expires_at`]; after that the key may
/// be handed to someone else whether or not it was released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    key: String,
    token: Uuid,
    issued_at: Instant,
    ttl: Duration,
}

impl Lease {
    /// `issued_at` must not be later than the moment the lock service
    /// started counting `ttl`, so that the local expiry never overshoots.
    pub fn new(key: impl Into<String>, token: Uuid, issued_at: Instant, ttl: Duration) -> Self {
        Self {
            key: key.into(),
            token,
            issued_at,
            ttl,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Owner token; only the holder of this token may release the key.
    pub fn token(&self) -> Uuid {
        self.token
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Moment after which the lock service may give the key away.
    pub fn expires_at(&self) -> Instant {
        self.issued_at + self.ttl
    }
}

/// Errors from a lock service.
#[derive(Debug, Error)]
pub enum LockError {
    #[error("key {key} is held by another owner")]
    Busy { key: String },

    #[error("lock service unavailable for key {key}")]
    Unavailable {
        key: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("lease on key {key} expired before it was released")]
    LeaseLost { key: String },
}

/// Timing of lease acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockSettings {
    /// How long a lease stays valid if its owner never releases it.
    pub lease_ttl: Duration,
    /// Upper bound on how long `acquire` waits for a held key.
    pub wait_timeout: Duration,
    /// Pause between acquisition attempts while waiting.
    pub retry_interval: Duration,
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            lease_ttl: Duration::from_secs(10),
            wait_timeout: Duration::from_secs(2),
            retry_interval: Duration::from_millis(50),
        }
    }
}

/// Distributed mutual exclusion keyed by string.
#[async_trait]
pub trait LockService: Send + Sync + 'static {
    /// Takes the key, waiting at most the configured bound.
    ///
    /// Returns [`LockError::Busy`] if the key is still held when the wait
    /// runs out.
    async fn acquire(&self, key: &str) -> Result<Lease, LockError>;

    /// Gives the key back. Fails with [`LockError::LeaseLost`] if the lease
    /// expired and the key was taken by someone else in the meantime.
    async fn release(&self, lease: Lease) -> Result<(), LockError>;
}

/// Repeats `attempt` until it yields a lease or `settings.wait_timeout`
/// elapses.
///
/// `attempt` returns `Ok(None)` when the key is currently held.
pub async fn poll_until_acquired<F, Fut>(
    key: &str,
    settings: &LockSettings,
    mut attempt: F,
) -> Result<Lease, LockError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<Lease>, LockError>>,
{
    let deadline = Instant::now() + settings.wait_timeout;

    loop {
        if let Some(lease) = attempt().await? {
            return Ok(lease);
        }

        let now = Instant::now();
        if now >= deadline {
            tracing::debug!(key, "lock wait timed out");
            return Err(LockError::Busy {
                key: key.to_string(),
            });
        }

        tokio::time::sleep(settings.retry_interval.min(deadline - now)).await;
    }
}

#[derive(Debug)]
struct Held {
    token: Uuid,
    expires_at: Instant,
}

/// Lock service for a single process.
///
/// Leases expire after `lease_ttl`, after which another caller may take the
/// key.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLockService {
    held: Arc<Mutex<HashMap<String, Held>>>,
    settings: LockSettings,
}

impl InMemoryLockService {
    pub fn new(settings: LockSettings) -> Self {
        Self {
            held: Arc::new(Mutex::new(HashMap::new())),
            settings,
        }
    }

    async fn try_acquire(&self, key: &str) -> Option<Lease> {
        let mut held = self.held.lock().await;
        let now = Instant::now();

        if held.get(key).is_some_and(|h| h.expires_at > now) {
            return None;
        }

        let lease = Lease::new(key, Uuid::new_v4(), now, self.settings.lease_ttl);
        held.insert(
            key.to_string(),
            Held {
                token: lease.token(),
                expires_at: lease.expires_at(),
            },
        );
        Some(lease)
    }

    /// Returns true if `key` has an unexpired lease.
    pub async fn is_locked(&self, key: &str) -> bool {
        let held = self.held.lock().await;
        held.get(key).is_some_and(|h| h.expires_at > Instant::now())
    }
}

#[async_trait]
impl LockService for InMemoryLockService {
    async fn acquire(&self, key: &str) -> Result<Lease, LockError> {
        poll_until_acquired(key, &self.settings, || async {
            Ok(self.try_acquire(key).await)
        })
        .await
    }

    async fn release(&self, lease: Lease) -> Result<(), LockError> {
        let mut held = self.held.lock().await;

        match held.get(lease.key()) {
            Some(h) if h.token == lease.token() => {
                held.remove(lease.key());
                Ok(())
            }
            _ => Err(LockError::LeaseLost {
                key: lease.key().to_string(),
            }),
        }
    }
}
