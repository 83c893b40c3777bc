//! Vessel existence lookup.

use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use common::VesselId;

use super::PortError;

/// Answers whether a vessel is known. Vessels themselves are owned elsewhere.
#[async_trait]
pub trait VesselChecker: Send + Sync {
    async fn exists(&self, vessel_id: VesselId) -> Result<bool, PortError>;
}

#[derive(Debug, Default)]
struct InMemoryVesselState {
    vessels: HashSet<VesselId>,
    fail_on_lookup: bool,
}

/// In-memory vessel registry for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryVesselRegistry {
    state: Arc<RwLock<InMemoryVesselState>>,
}

impl InMemoryVesselRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `vessel_id` known to the registry.
    pub fn register(&self, vessel_id: VesselId) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .vessels
            .insert(vessel_id);
    }

    /// Configures the registry to fail on subsequent lookups.
    pub fn set_fail_on_lookup(&self, fail: bool) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .fail_on_lookup = fail;
    }
}

#[async_trait]
impl VesselChecker for InMemoryVesselRegistry {
    async fn exists(&self, vessel_id: VesselId) -> Result<bool, PortError> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);

        if state.fail_on_lookup {
            return Err(PortError::new("vessel registry", "lookup timed out"));
        }
        Ok(state.vessels.contains(&vessel_id))
    }
}
