//! Message and handler contracts.

use async_trait::async_trait;

use crate::context::Context;

/// A command or query routed by the bus.
///
/// `TYPE` is the routing tag; it must be unique across every message
/// registered on the same bus.
pub trait Message: Send + 'static {
    const TYPE: &'static str;
}

/// A message that mutates shared state and must be serialized across
/// process instances.
pub trait Blocking: Message {
    /// Key identifying the resource this message mutates.
    ///
    /// Two messages with the same key never run their handlers concurrently
    /// when dispatched through [`BlockingBus`](crate::BlockingBus).
    fn blocking_key(&self) -> String;
}

/// Handles exactly one message type.
#[async_trait]
pub trait Handler<M: Message>: Send + Sync + 'static {
    /// Value returned to `ask` callers. Use `()` for commands.
    type Output: Send + 'static;

    /// Error returned to callers unchanged.
    type Error: Send + 'static;

    async fn handle(&self, ctx: &Context, message: M) -> Result<Self::Output, Self::Error>;
}
