//! Dispatcher - the store a run writes to, picked from configuration

use std::sync::Arc;

use contracts::{ContextStoreConfig, Entity, EntityStore, RetryPolicy, SyncError};
use serde_json::Value;
use tracing::{info, instrument};

use crate::client::ContextBrokerClient;
use crate::metrics::StoreMetrics;
use crate::stores::DryRunStore;

/// Context store used by a run
pub enum Dispatcher {
    /// Writes go to Orion
    Live(ContextBrokerClient),
    /// Reads go to Orion, writes are only logged
    DryRun(DryRunStore<ContextBrokerClient>),
}

impl Dispatcher {
    /// Underlying broker client
    pub fn client(&self) -> &ContextBrokerClient {
        match self {
            Dispatcher::Live(client) => client,
            Dispatcher::DryRun(store) => store.inner(),
        }
    }

    pub fn is_dry_run(&self) -> bool {
        matches!(self, Dispatcher::DryRun(_))
    }

    /// Store counters of the underlying client
    pub fn metrics(&self) -> Arc<StoreMetrics> {
        self.client().metrics()
    }

    /// Authenticate the tenant up front so credential errors surface early
    pub async fn authenticate(&self, tenant: &str) -> Result<(), SyncError> {
        self.client().authenticate(tenant).await.map(|_| ())
    }
}

impl EntityStore for Dispatcher {
    fn name(&self) -> &str {
        match self {
            Dispatcher::Live(client) => client.name(),
            Dispatcher::DryRun(store) => store.name(),
        }
    }

    async fn get_entity(
        &self,
        tenant: &str,
        id: &str,
        entity_type: &str,
    ) -> Result<Option<Value>, SyncError> {
        match self {
            Dispatcher::Live(client) => client.get_entity(tenant, id, entity_type).await,
            Dispatcher::DryRun(store) => store.get_entity(tenant, id, entity_type).await,
        }
    }

    async fn send_batch(&self, tenant: &str, entities: &[Entity]) -> Result<(), SyncError> {
        match self {
            Dispatcher::Live(client) => client.send_batch(tenant, entities).await,
            Dispatcher::DryRun(store) => store.send_batch(tenant, entities).await,
        }
    }
}

/// Convenience function to create a dispatcher from the store config
#[instrument(
    name = "dispatcher_create",
    skip(config, policy),
    fields(orion = %config.orion_url, tenant = %config.subservice)
)]
pub fn create_dispatcher(
    config: &ContextStoreConfig,
    policy: RetryPolicy,
    dry_run: bool,
) -> Result<Dispatcher, SyncError> {
    let client = ContextBrokerClient::new(config, policy)?;
    let dispatcher = if dry_run {
        Dispatcher::DryRun(DryRunStore::new(client))
    } else {
        Dispatcher::Live(client)
    };
    info!(store = dispatcher.name(), "context store ready");
    Ok(dispatcher)
}
