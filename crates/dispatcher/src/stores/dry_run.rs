//! DryRunStore - reads from the real store, logs writes via tracing

use std::sync::atomic::{AtomicU64, Ordering};

use contracts::{Entity, EntityStore, SyncError};
use serde_json::Value;
use tracing::{debug, info, instrument};

/// Store that delegates reads and only logs batch summaries
pub struct DryRunStore<S> {
    inner: S,
    batches: AtomicU64,
}

impl<S> DryRunStore<S> {
    /// Wrap a store whose writes should be suppressed
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            batches: AtomicU64::new(0),
        }
    }

    /// Wrapped store
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Batches that would have been written
    pub fn batches_logged(&self) -> u64 {
        self.batches.load(Ordering::Relaxed)
    }

    fn log_batch_summary(&self, tenant: &str, entities: &[Entity]) {
        let first = entities.first().map(Entity::id).unwrap_or_default();
        let last = entities.last().map(Entity::id).unwrap_or_default();

        info!(
            tenant = %tenant,
            entities = entities.len(),
            first = %first,
            last = %last,
            "dry run: batch not sent"
        );
        for entity in entities {
            debug!(id = %entity.id(), entity_type = %entity.entity_type(), "dry run entity");
        }
    }
}

impl<S: EntityStore + Sync> EntityStore for DryRunStore<S> {
    fn name(&self) -> &str {
        "dry-run"
    }

    async fn get_entity(
        &self,
        tenant: &str,
        id: &str,
        entity_type: &str,
    ) -> Result<Option<Value>, SyncError> {
        self.inner.get_entity(tenant, id, entity_type).await
    }

    #[instrument(
        name = "dry_run_send_batch",
        skip(self, entities),
        fields(entities = entities.len())
    )]
    async fn send_batch(&self, tenant: &str, entities: &[Entity]) -> Result<(), SyncError> {
        self.log_batch_summary(tenant, entities);
        self.batches.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn test_dry_run_reads_through_and_drops_writes() {
        let memory =
            MemoryStore::new().with_entity("/parking", "pomid:1", json!({ "id": "pomid:1" }));
        let store = DryRunStore::new(memory);

        let found = store
            .get_entity("/parking", "pomid:1", "ParkingSpot")
            .await
            .unwrap();
        assert!(found.is_some());

        store.send_batch("/parking", &[]).await.unwrap();
        assert_eq!(store.batches_logged(), 1);
        assert!(store.inner().batches().is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_name() {
        let store = DryRunStore::new(MemoryStore::new());
        assert_eq!(store.name(), "dry-run");
    }
}
