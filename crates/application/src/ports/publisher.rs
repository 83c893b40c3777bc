//! Outbound domain event publishing.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use domain::{CargoEvent, DomainEvent};

use super::PortError;

/// Hands recorded domain events to the outside world.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, events: Vec<CargoEvent>) -> Result<(), PortError>;
}

#[derive(Debug, Default)]
struct InMemoryPublisherState {
    published: Vec<CargoEvent>,
    fail_on_publish: bool,
}

/// In-memory publisher for testing. Keeps everything it was given.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventPublisher {
    state: Arc<RwLock<InMemoryPublisherState>>,
}

impl InMemoryEventPublisher {
    /// Creates a new in-memory publisher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the publisher to fail on subsequent calls.
    pub fn set_fail_on_publish(&self, fail: bool) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .fail_on_publish = fail;
    }

    /// Returns every event published so far, oldest first.
    pub fn published(&self) -> Vec<CargoEvent> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .published
            .clone()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventPublisher {
    async fn publish(&self, events: Vec<CargoEvent>) -> Result<(), PortError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        if state.fail_on_publish {
            return Err(PortError::new("event publisher", "broker rejected the batch"));
        }

        for event in &events {
            tracing::debug!(
                event_type = event.event_type(),
                cargo_id = %event.aggregate_id(),
                "event published"
            );
        }
        state.published.extend(events);

        Ok(())
    }
}
