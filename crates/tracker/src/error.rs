//! Errors surfaced by the tracker facade.

use application::ApplicationError;
use bus::{BusError, DispatchError, LockError};
use cargo_store::StoreError;
use thiserror::Error;

/// Classification of a [`TrackerError`], extending the use case taxonomy
/// with dispatch-level outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Infrastructure,
    /// Another caller holds the cargo; retrying later may succeed.
    Busy,
    /// A wiring defect.
    Internal,
}

impl From<application::ErrorKind> for ErrorKind {
    fn from(kind: application::ErrorKind) -> Self {
        match kind {
            application::ErrorKind::Validation => ErrorKind::Validation,
            application::ErrorKind::Conflict => ErrorKind::Conflict,
            application::ErrorKind::NotFound => ErrorKind::NotFound,
            application::ErrorKind::Infrastructure => ErrorKind::Infrastructure,
        }
    }
}

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError<ApplicationError>),

    #[error("handler registration failed: {0}")]
    Registration(#[from] BusError),

    #[error("DATABASE_URL is not set")]
    MissingDatabaseUrl,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl TrackerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TrackerError::Dispatch(error) => match error {
                DispatchError::Handler(error) => error.kind().into(),
                DispatchError::LockUnavailable {
                    source: LockError::Busy { .. },
                    ..
                } => ErrorKind::Busy,
                DispatchError::LockUnavailable { .. }
                | DispatchError::LeaseExpired { .. }
                | DispatchError::Cancelled(_) => ErrorKind::Infrastructure,
                DispatchError::HandlerNotRegistered(_) => ErrorKind::Internal,
            },
            TrackerError::Registration(_) | TrackerError::MissingDatabaseUrl => ErrorKind::Internal,
            TrackerError::Database(_) | TrackerError::Store(_) => ErrorKind::Infrastructure,
        }
    }

    /// The use case error, when the handler itself failed.
    pub fn application_error(&self) -> Option<&ApplicationError> {
        match self {
            TrackerError::Dispatch(error) => error.handler_error(),
            _ => None,
        }
    }
}
