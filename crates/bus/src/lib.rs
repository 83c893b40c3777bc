//! In-process dispatch for commands and queries.
//!
//! This crate provides:
//! - [`Message`] and [`Handler`] traits binding a stable type tag to one handler
//! - [`BusBuilder`], a start-up registration table frozen into an immutable [`Bus`]
//! - [`BlockingBus`], which serializes [`Blocking`] messages by key through a [`LockService`]
//! - [`Context`], the caller's cancellation signal

pub mod blocking;
pub mod bus;
pub mod context;
pub mod error;
pub mod lock;
pub mod message;

pub use blocking::BlockingBus;
pub use bus::{Bus, BusBuilder};
pub use context::{CancelHandle, Context};
pub use error::{BusError, DispatchError};
pub use lock::{InMemoryLockService, Lease, LockError, LockService, LockSettings};
pub use message::{Blocking, Handler, Message};
