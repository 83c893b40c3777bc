//! Serialized dispatch of [`Blocking`] messages.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures_util::FutureExt;

use crate::bus::Bus;
use crate::context::Context;
use crate::error::DispatchError;
use crate::lock::{Lease, LockService};
use crate::message::Blocking;

/// Wraps a [`Bus`] so that blocking messages with the same key never run
/// concurrently, across every process sharing the lock service.
///
/// The wrapper does not retry: a key that stays busy past the lock service's
/// wait bound fails the dispatch without invoking the handler. A handler that
/// is still running when its lease nears expiry is dropped and the dispatch
/// fails with [`DispatchError::LeaseExpired`].
pub struct BlockingBus<L, E> {
    bus: Bus<E>,
    locks: Arc<L>,
}

impl<L, E> Clone for BlockingBus<L, E> {
    fn clone(&self) -> Self {
        Self {
            bus: self.bus.clone(),
            locks: Arc::clone(&self.locks),
        }
    }
}

impl<L: LockService, E: Send + 'static> BlockingBus<L, E> {
    pub fn new(bus: Bus<E>, locks: Arc<L>) -> Self {
        Self { bus, locks }
    }

    /// The underlying bus, for messages that need no serialization.
    pub fn bus(&self) -> &Bus<E> {
        &self.bus
    }

    pub fn locks(&self) -> &Arc<L> {
        &self.locks
    }

    /// Dispatches `message` while holding its blocking key.
    pub async fn dispatch_blocking<M: Blocking>(
        &self,
        ctx: &Context,
        message: M,
    ) -> Result<(), DispatchError<E>> {
        let key = message.blocking_key();
        let work = self.bus.dispatch(ctx, message);
        self.guarded(ctx, M::TYPE, key, work).await
    }

    /// Like [`Bus::ask`] while holding the message's blocking key.
    pub async fn ask_blocking<M: Blocking, R: Send + 'static>(
        &self,
        ctx: &Context,
        message: M,
    ) -> Result<R, DispatchError<E>> {
        let key = message.blocking_key();
        let work = self.bus.ask::<M, R>(ctx, message);
        self.guarded(ctx, M::TYPE, key, work).await
    }

    /// Runs `work` under the lease for `key`. The lease is released whether
    /// `work` succeeds, fails, panics or is cancelled.
    #[tracing::instrument(skip(self, ctx, work))]
    async fn guarded<T>(
        &self,
        ctx: &Context,
        message_type: &'static str,
        key: String,
        work: impl Future<Output = Result<T, DispatchError<E>>> + Send,
    ) -> Result<T, DispatchError<E>> {
        if ctx.is_cancelled() {
            return Err(DispatchError::Cancelled(message_type));
        }

        let started = Instant::now();
        let acquired = tokio::select! {
            biased;
            () = ctx.cancelled() => return Err(DispatchError::Cancelled(message_type)),
            acquired = self.locks.acquire(&key) => acquired,
        };

        let lease = match acquired {
            Ok(lease) => lease,
            Err(source) => {
                metrics::counter!("bus_lock_busy_total", "message_type" => message_type)
                    .increment(1);
                tracing::warn!(%key, error = %source, "blocking key unavailable");
                return Err(DispatchError::LockUnavailable { key, source });
            }
        };

        let deadline = work_deadline(&lease);
        let guard = LeaseGuard::new(Arc::clone(&self.locks), lease);
        let outcome = tokio::select! {
            biased;
            () = ctx.cancelled() => Ok(Err(DispatchError::Cancelled(message_type))),
            outcome = AssertUnwindSafe(work).catch_unwind() => outcome,
            () = tokio::time::sleep_until(deadline) => {
                metrics::counter!("bus_lease_expired_total", "message_type" => message_type)
                    .increment(1);
                tracing::warn!(%key, "handler outlived its lease and was stopped");
                Ok(Err(DispatchError::LeaseExpired { message_type, key }))
            }
        };
        guard.release().await;

        metrics::histogram!("bus_blocking_dispatch_seconds", "message_type" => message_type)
            .record(started.elapsed().as_secs_f64());

        match outcome {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

/// Latest moment a handler may still be running under `lease`.
///
/// A fifth of the ttl is kept in reserve so the handler is stopped before the
/// lock service can hand the key to the next caller.
fn work_deadline(lease: &Lease) -> tokio::time::Instant {
    lease.expires_at() - lease.ttl() / 5
}

/// Releases its lease when dropped if [`LeaseGuard::release`] was never
/// reached, which happens when the caller drops the dispatch future.
struct LeaseGuard<L: LockService> {
    locks: Arc<L>,
    lease: Option<Lease>,
}

impl<L: LockService> LeaseGuard<L> {
    fn new(locks: Arc<L>, lease: Lease) -> Self {
        Self {
            locks,
            lease: Some(lease),
        }
    }

    async fn release(mut self) {
        if let Some(lease) = self.lease.take() {
            release_lease(self.locks.as_ref(), lease).await;
        }
    }
}

impl<L: LockService> Drop for LeaseGuard<L> {
    fn drop(&mut self) {
        let Some(lease) = self.lease.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let locks = Arc::clone(&self.locks);
                runtime.spawn(async move { release_lease(locks.as_ref(), lease).await });
            }
            Err(_) => {
                tracing::warn!(key = lease.key(), "lease dropped outside a runtime; left to expire");
            }
        }
    }
}

async fn release_lease<L: LockService>(locks: &L, lease: Lease) {
    let key = lease.key().to_string();
    if let Err(error) = locks.release(lease).await {
        tracing::warn!(%key, %error, "failed to release blocking key");
    }
}
