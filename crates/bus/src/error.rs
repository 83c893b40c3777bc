//! Bus error types.

use thiserror::Error;

use crate::lock::LockError;

/// Errors raised while wiring handlers at start-up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    #[error("handler already registered for message type {0}")]
    HandlerAlreadyRegistered(&'static str),
}

/// Errors returned from dispatching a message.
///
/// `E` is the error type shared by every handler on the bus; it is passed
/// through untouched in [`DispatchError::Handler`].
#[derive(Debug, Error)]
pub enum DispatchError<E> {
    #[error("no handler registered for message type {0}")]
    HandlerNotRegistered(&'static str),

    #[error(transparent)]
    Handler(E),

    #[error("could not acquire blocking key {key}: {source}")]
    LockUnavailable {
        key: String,
        #[source]
        source: LockError,
    },

    /// The handler was still running when its lease was about to run out,
    /// so it was stopped before another owner could take the key.
    #[error("lease on {key} ran out before the handler for {message_type} finished")]
    LeaseExpired {
        message_type: &'static str,
        key: String,
    },

    #[error("dispatch of {0} was cancelled")]
    Cancelled(&'static str),
}

impl<E> DispatchError<E> {
    /// Returns the handler's own error, if that is what failed.
    pub fn handler_error(&self) -> Option<&E> {
        match self {
            DispatchError::Handler(error) => Some(error),
            _ => None,
        }
    }

    pub fn into_handler_error(self) -> Option<E> {
        match self {
            DispatchError::Handler(error) => Some(error),
            _ => None,
        }
    }

    /// True when the blocking key was held by another caller.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            DispatchError::LockUnavailable {
                source: LockError::Busy { .. },
                ..
            }
        )
    }
}
