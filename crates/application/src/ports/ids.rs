//! Identifier source for new tracking entries.

use common::TrackingId;

pub trait IdProvider: Send + Sync {
    /// Returns a fresh identifier in its canonical text form.
    fn new_id(&self) -> String;
}

/// Time-ordered UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidV7Provider;

impl IdProvider for UuidV7Provider {
    fn new_id(&self) -> String {
        TrackingId::generate().to_string()
    }
}
