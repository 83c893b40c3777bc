//! Handler registration and typed dispatch.

use std::any::{Any, type_name};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::context::Context;
use crate::error::{BusError, DispatchError};
use crate::message::{Handler, Message};

type AnyBox = Box<dyn Any + Send>;

/// A handler with its message and output types erased.
#[async_trait]
trait ErasedHandler<E>: Send + Sync {
    fn output_type(&self) -> &'static str;

    async fn handle(&self, ctx: &Context, message: AnyBox) -> Result<AnyBox, E>;
}

struct Registered<M, H> {
    handler: H,
    _message: PhantomData<fn(M)>,
}

#[async_trait]
impl<M, H, E> ErasedHandler<E> for Registered<M, H>
where
    M: Message,
    H: Handler<M, Error = E>,
    E: Send + 'static,
{
    fn output_type(&self) -> &'static str {
        type_name::<H::Output>()
    }

    async fn handle(&self, ctx: &Context, message: AnyBox) -> Result<AnyBox, E> {
        let message = match message.downcast::<M>() {
            Ok(message) => *message,
            Err(_) => panic!(
                "message routed to {} is not a {}; two message types share the tag",
                M::TYPE,
                type_name::<M>()
            ),
        };

        let output = self.handler.handle(ctx, message).await?;
        Ok(Box::new(output))
    }
}

type HandlerMap<E> = HashMap<&'static str, Arc<dyn ErasedHandler<E>>>;

/// Collects handlers at start-up.
///
/// Registration may happen from several threads; the table is guarded by a
/// single mutex. Call [`BusBuilder::build`] once wiring is finished.
pub struct BusBuilder<E> {
    handlers: Mutex<HandlerMap<E>>,
}

impl<E: Send + 'static> BusBuilder<E> {
    pub fn new() -> Self {
        Self {
            handlers: Mutex::new(HashMap::new()),
        }
    }

    /// Binds `handler` to `M::TYPE`.
    ///
    /// Fails if a handler is already bound to the tag; the existing binding is
    /// kept.
    pub fn register<M, H>(&self, handler: H) -> Result<(), BusError>
    where
        M: Message,
        H: Handler<M, Error = E>,
    {
        let mut handlers = self.handlers.lock().unwrap_or_else(PoisonError::into_inner);
        if handlers.contains_key(M::TYPE) {
            return Err(BusError::HandlerAlreadyRegistered(M::TYPE));
        }

        handlers.insert(
            M::TYPE,
            Arc::new(Registered {
                handler,
                _message: PhantomData,
            }),
        );
        tracing::debug!(message_type = M::TYPE, "handler registered");

        Ok(())
    }

    /// Freezes the table. The returned bus is read without locking.
    pub fn build(self) -> Bus<E> {
        let handlers = self
            .handlers
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);

        Bus {
            handlers: Arc::new(handlers),
        }
    }
}

impl<E: Send + 'static> Default for BusBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable routing table from message tag to handler.
pub struct Bus<E> {
    handlers: Arc<HandlerMap<E>>,
}

impl<E> Clone for Bus<E> {
    fn clone(&self) -> Self {
        Self {
            handlers: Arc::clone(&self.handlers),
        }
    }
}

impl<E: Send + 'static> Bus<E> {
    /// Routes `message` to its handler and discards the output.
    pub async fn dispatch<M: Message>(
        &self,
        ctx: &Context,
        message: M,
    ) -> Result<(), DispatchError<E>> {
        self.execute(ctx, message).await.map(drop)
    }

    /// Routes `message` to its handler and returns its output as `R`.
    ///
    /// # Panics
    ///
    /// Panics if the registered handler's output type is not `R`. This is a
    /// wiring defect, not a runtime condition.
    pub async fn ask<M: Message, R: 'static>(
        &self,
        ctx: &Context,
        message: M,
    ) -> Result<R, DispatchError<E>> {
        let (output, output_type) = self.execute(ctx, message).await?;

        match output.downcast::<R>() {
            Ok(output) => Ok(*output),
            Err(_) => panic!(
                "handler for {} returns {} but the caller expected {}",
                M::TYPE,
                output_type,
                type_name::<R>()
            ),
        }
    }

    #[tracing::instrument(skip_all, fields(message_type = M::TYPE))]
    async fn execute<M: Message>(
        &self,
        ctx: &Context,
        message: M,
    ) -> Result<(AnyBox, &'static str), DispatchError<E>> {
        let handler = self
            .handlers
            .get(M::TYPE)
            .ok_or(DispatchError::HandlerNotRegistered(M::TYPE))?;

        metrics::counter!("bus_dispatch_total", "message_type" => M::TYPE).increment(1);

        let output = handler
            .handle(ctx, Box::new(message))
            .await
            .map_err(DispatchError::Handler)?;

        Ok((output, handler.output_type()))
    }
}

// Query methods
impl<E> Bus<E> {
    pub fn is_registered(&self, message_type: &str) -> bool {
        self.handlers.contains_key(message_type)
    }

    /// Returns the registered tags, sorted.
    pub fn message_types(&self) -> Vec<&'static str> {
        let mut types: Vec<_> = self.handlers.keys().copied().collect();
        types.sort_unstable();
        types
    }
}
