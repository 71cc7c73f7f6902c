//! EntityStore trait - Dispatcher output interface
//!
//! Defines the abstract interface of the context store.

use serde_json::Value;

use crate::{Entity, SyncError};

/// Context store access scoped per tenant (subservice).
#[trait_variant::make(EntityStore: Send)]
pub trait LocalEntityStore {
    /// Store name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Point lookup of a single entity
    ///
    /// # Errors
    /// Returns `NetworkFault` when the store keeps rejecting the read
    async fn get_entity(
        &self,
        tenant: &str,
        id: &str,
        entity_type: &str,
    ) -> Result<Option<Value>, SyncError>;

    /// Append-upsert one batch
    ///
    /// # Errors
    /// Returns `NetworkFault` once the retry budget is exhausted
    async fn send_batch(&self, tenant: &str, entities: &[Entity]) -> Result<(), SyncError>;
}
