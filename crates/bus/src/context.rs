//! Per-request context carrying the caller's cancellation signal.

use tokio::sync::watch;

/// Request-scoped context passed to every handler.
///
/// Cloning is cheap; clones observe the same cancellation signal.
#[derive(Debug, Clone, Default)]
pub struct Context {
    cancel: Option<watch::Receiver<bool>>,
}

/// Owner side of a cancellable [`Context`].
#[derive(Debug)]
pub struct CancelHandle(watch::Sender<bool>);

impl Context {
    /// A context that is never cancelled.
    pub fn background() -> Self {
        Self::default()
    }

    /// A context that is cancelled through the returned handle.
    pub fn with_cancel() -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        (Self { cancel: Some(rx) }, CancelHandle(tx))
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Completes once the context is cancelled.
    ///
    /// Never completes for a background context, or when the handle is
    /// dropped without cancelling.
    pub async fn cancelled(&self) {
        let Some(rx) = &self.cancel else {
            return std::future::pending().await;
        };

        let mut rx = rx.clone();
        let closed = rx.wait_for(|cancelled| *cancelled).await.is_err();
        if closed {
            std::future::pending::<()>().await;
        }
    }
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }
}
