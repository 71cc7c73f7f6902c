//! MemoryStore - in-process context store for tests and local runs

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard};

use contracts::{Entity, EntityStore, SyncError};
use serde_json::Value;
use tracing::debug;

/// One accepted batch
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedBatch {
    pub tenant: String,
    pub entities: Vec<Entity>,
}

/// Store keeping entities in a map keyed by `(tenant, id)`
///
/// Accepted batches replace the stored entity, so a second run observes the
/// watermark written by the first one.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entities: Mutex<HashMap<(String, String), Value>>,
    batches: Mutex<Vec<RecordedBatch>>,
    /// Remaining batch writes to reject with a network fault
    failures: AtomicU32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an existing entity
    pub fn with_entity(self, tenant: &str, id: &str, entity: Value) -> Self {
        lock(&self.entities).insert((tenant.to_string(), id.to_string()), entity);
        self
    }

    /// Reject the next `count` batch writes
    pub fn failing_batches(self, count: u32) -> Self {
        self.failures.store(count, Ordering::SeqCst);
        self
    }

    /// Batches accepted so far, in order
    pub fn batches(&self) -> Vec<RecordedBatch> {
        lock(&self.batches).clone()
    }

    /// Stored entity, if any
    pub fn entity(&self, tenant: &str, id: &str) -> Option<Value> {
        lock(&self.entities)
            .get(&(tenant.to_string(), id.to_string()))
            .cloned()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl EntityStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get_entity(
        &self,
        tenant: &str,
        id: &str,
        _entity_type: &str,
    ) -> Result<Option<Value>, SyncError> {
        Ok(self.entity(tenant, id))
    }

    async fn send_batch(&self, tenant: &str, entities: &[Entity]) -> Result<(), SyncError> {
        let rejected = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if rejected {
            return Err(SyncError::network_fault(
                "memory://v2/op/update",
                500,
                "injected failure",
            ));
        }

        {
            let mut stored = lock(&self.entities);
            for entity in entities {
                let value = serde_json::to_value(entity)
                    .map_err(|e| SyncError::decode(entity.id(), e))?;
                stored.insert((tenant.to_string(), entity.id().to_string()), value);
            }
        }
        lock(&self.batches).push(RecordedBatch {
            tenant: tenant.to_string(),
            entities: entities.to_vec(),
        });

        debug!(tenant = %tenant, entities = entities.len(), "memory store batch accepted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_seeded_entity_is_served() {
        let store = MemoryStore::new().with_entity("/a", "pomid:1", json!({ "id": "pomid:1" }));
        assert!(store.get_entity("/a", "pomid:1", "ParkingSpot").await.unwrap().is_some());
        assert!(store.get_entity("/b", "pomid:1", "ParkingSpot").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_injected_failures_are_consumed() {
        let store = MemoryStore::new().failing_batches(1);
        let err = store.send_batch("/a", &[]).await.unwrap_err();
        assert!(matches!(err, SyncError::NetworkFault { .. }));
        assert!(store.send_batch("/a", &[]).await.is_ok());
        assert_eq!(store.batches().len(), 1);
    }
}
