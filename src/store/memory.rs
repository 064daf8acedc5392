//! In-memory config store for tests and local runs

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::records::{ExchangeConfig, ProviderConfig, WorkerDefinition};
use super::ConfigStore;
use crate::error::{FleetError, Result};

#[derive(Default)]
struct Tables {
    /// Insertion order is kept so listings are stable
    definitions: Vec<WorkerDefinition>,
    providers: Vec<ProviderConfig>,
    exchanges: Vec<ExchangeConfig>,
    settings: HashMap<String, String>,
}

/// `ConfigStore` backed by process memory
#[derive(Default)]
pub struct MemoryConfigStore {
    tables: RwLock<Tables>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a worker definition (keyed by tenant + id)
    pub async fn put_definition(&self, definition: WorkerDefinition) {
        let mut tables = self.tables.write().await;
        tables
            .definitions
            .retain(|d| !(d.id == definition.id && d.tenant_id == definition.tenant_id));
        tables.definitions.push(definition);
    }

    /// Delete a worker definition; returns whether a row was removed
    pub async fn delete_definition(&self, tenant_id: &str, worker_id: &str) -> bool {
        let mut tables = self.tables.write().await;
        let before = tables.definitions.len();
        tables
            .definitions
            .retain(|d| !(d.id == worker_id && d.tenant_id == tenant_id));
        tables.definitions.len() != before
    }

    pub async fn put_provider(&self, provider: ProviderConfig) {
        let mut tables = self.tables.write().await;
        tables
            .providers
            .retain(|p| !(p.id == provider.id && p.tenant_id == provider.tenant_id));
        tables.providers.push(provider);
    }

    pub async fn put_exchange(&self, exchange: ExchangeConfig) {
        let mut tables = self.tables.write().await;
        tables
            .exchanges
            .retain(|e| !(e.id == exchange.id && e.tenant_id == exchange.tenant_id));
        tables.exchanges.push(exchange);
    }

    pub async fn set_setting(&self, key: &str, value: &str) {
        self.tables
            .write()
            .await
            .settings
            .insert(key.to_string(), value.to_string());
    }

    /// Current run flag of a definition, if it exists
    pub async fn run_flag(&self, tenant_id: &str, worker_id: &str) -> Option<bool> {
        self.tables
            .read()
            .await
            .definitions
            .iter()
            .find(|d| d.id == worker_id && d.tenant_id == tenant_id)
            .map(|d| d.run_flag)
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn worker_definitions(&self, tenant_id: &str) -> Result<Vec<WorkerDefinition>> {
        let tables = self.tables.read().await;
        Ok(tables
            .definitions
            .iter()
            .filter(|d| d.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn all_worker_definitions(&self) -> Result<Vec<WorkerDefinition>> {
        Ok(self.tables.read().await.definitions.clone())
    }

    async fn provider_configs(&self, tenant_id: &str) -> Result<Vec<ProviderConfig>> {
        let tables = self.tables.read().await;
        Ok(tables
            .providers
            .iter()
            .filter(|p| p.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn exchange_configs(&self, tenant_id: &str) -> Result<Vec<ExchangeConfig>> {
        let tables = self.tables.read().await;
        Ok(tables
            .exchanges
            .iter()
            .filter(|e| e.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn system_setting(&self, key: &str) -> Result<Option<String>> {
        Ok(self.tables.read().await.settings.get(key).cloned())
    }

    async fn set_worker_run_flag(
        &self,
        tenant_id: &str,
        worker_id: &str,
        running: bool,
    ) -> Result<()> {
        let mut tables = self.tables.write().await;
        let definition = tables
            .definitions
            .iter_mut()
            .find(|d| d.id == worker_id && d.tenant_id == tenant_id)
            .ok_or_else(|| FleetError::WorkerNotFound(worker_id.to_string()))?;
        definition.run_flag = running;
        Ok(())
    }
}
