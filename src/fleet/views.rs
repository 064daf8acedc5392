//! Read-only fleet projections
//!
//! Builds per-worker summaries for the dashboard and competition views by
//! querying each registered worker's status and account. Workers whose
//! definition has been deleted from the store are left out, as are workers
//! whose account query fails.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

use super::handle::WorkerHandle;
use super::registry::WorkerRegistry;
use super::state::TenantScope;
use crate::error::{FleetError, Result};
use crate::store::{ConfigStore, WorkerDefinition};
use crate::tenancy::TenancyResolver;

/// Label used when a worker's exchange cannot be looked up
pub const UNKNOWN_EXCHANGE: &str = "Unknown";

/// One worker's row in a fleet snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkerSummary {
    pub worker_id: String,
    pub worker_name: String,
    pub tenant_id: String,
    pub ai_model: String,
    pub exchange: String,
    /// `"<ai_model> - <exchange>"`
    pub display_name: String,
    pub total_equity: Decimal,
    pub total_pnl: Decimal,
    pub total_pnl_pct: Decimal,
    pub position_count: usize,
    pub margin_used_pct: Decimal,
    pub call_count: u64,
    pub is_running: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FleetSnapshot {
    pub workers: Vec<WorkerSummary>,
    pub count: usize,
    /// Set on fleet-wide snapshots only
    pub captured_at: Option<DateTime<Utc>>,
}

pub struct FleetViews {
    registry: Arc<WorkerRegistry>,
    store: Arc<dyn ConfigStore>,
    tenancy: TenancyResolver,
}

impl FleetViews {
    pub fn new(
        registry: Arc<WorkerRegistry>,
        store: Arc<dyn ConfigStore>,
        tenancy: TenancyResolver,
    ) -> Self {
        Self {
            registry,
            store,
            tenancy,
        }
    }

    /// Summaries for every registered worker in scope.
    ///
    /// Handles are collected under the registry read lock, which is released
    /// before any worker is queried. Workers are queried concurrently. If the
    /// current definitions cannot be read the stale-worker filter is skipped
    /// and exchange labels fall back to `Unknown`.
    pub async fn snapshot(&self, scope: &TenantScope) -> Result<FleetSnapshot> {
        let definitions = match self.definitions(scope).await {
            Ok(defs) => Some(defs),
            Err(e) => {
                warn!(%scope, error = %e, "failed to read definitions, stale filter disabled");
                None
            }
        };
        let by_id: Option<HashMap<&str, &WorkerDefinition>> = definitions
            .as_ref()
            .map(|defs| defs.iter().map(|d| (d.id.as_str(), d)).collect());

        let handles: Vec<Arc<WorkerHandle>> = self
            .registry
            .list()
            .await
            .into_iter()
            .filter(|h| self.in_scope(h, scope))
            .filter(|h| match &by_id {
                Some(by_id) => {
                    let current = by_id.contains_key(h.id());
                    if !current {
                        debug!(worker_id = %h.id(), "definition deleted, excluded from view");
                    }
                    current
                }
                None => true,
            })
            .collect();

        let labels = self.exchange_labels(&handles, by_id.as_ref()).await;

        let queries = handles.iter().map(|handle| async move {
            let status = handle.status();
            let account = handle.worker().account_info().await;
            (handle, status, account)
        });

        let mut workers = Vec::with_capacity(handles.len());
        for (handle, status, account) in join_all(queries).await {
            let account = match account {
                Ok(account) => account,
                Err(e) => {
                    let e = FleetError::QueryFailed {
                        worker_id: handle.id().to_string(),
                        reason: e.to_string(),
                    };
                    warn!(worker_id = %handle.id(), error = %e, "account query failed, excluded from view");
                    continue;
                }
            };

            let ai_model = handle.worker().ai_model_label().to_string();
            let exchange = labels
                .get(handle.id())
                .cloned()
                .unwrap_or_else(|| UNKNOWN_EXCHANGE.to_string());
            workers.push(WorkerSummary {
                worker_id: handle.id().to_string(),
                worker_name: handle.worker().name().to_string(),
                tenant_id: handle.tenant_id().to_string(),
                display_name: format!("{} - {}", ai_model, exchange),
                ai_model,
                exchange,
                total_equity: account.total_equity,
                total_pnl: account.total_pnl,
                total_pnl_pct: account.total_pnl_pct,
                position_count: account.position_count,
                margin_used_pct: account.margin_used_pct,
                call_count: status.call_count,
                is_running: status.is_running,
            });
        }
        workers.sort_by(|a, b| a.worker_id.cmp(&b.worker_id));

        Ok(FleetSnapshot {
            count: workers.len(),
            workers,
            captured_at: matches!(scope, TenantScope::All).then(Utc::now),
        })
    }

    /// Fleet-wide competition view
    pub async fn competition(&self) -> Result<FleetSnapshot> {
        self.snapshot(&TenantScope::All).await
    }

    async fn definitions(&self, scope: &TenantScope) -> Result<Vec<WorkerDefinition>> {
        match scope {
            TenantScope::All => self.store.all_worker_definitions().await,
            TenantScope::Tenant(tenant) => self.store.worker_definitions(tenant).await,
        }
    }

    fn in_scope(&self, handle: &WorkerHandle, scope: &TenantScope) -> bool {
        match scope {
            TenantScope::All => true,
            TenantScope::Tenant(tenant) if handle.tenant_inferred() => {
                self.tenancy.belongs_to(handle.id(), tenant)
            }
            TenantScope::Tenant(tenant) => handle.tenant_id() == tenant,
        }
    }

    /// Exchange display names keyed by worker id. Workers without a
    /// resolvable exchange are absent.
    async fn exchange_labels(
        &self,
        handles: &[Arc<WorkerHandle>],
        by_id: Option<&HashMap<&str, &WorkerDefinition>>,
    ) -> HashMap<String, String> {
        let mut labels = HashMap::new();
        let Some(by_id) = by_id else {
            return labels;
        };

        let wanted: Vec<&WorkerDefinition> = handles
            .iter()
            .filter_map(|h| by_id.get(h.id()).copied())
            .collect();
        let tenants: BTreeSet<&str> = wanted.iter().map(|d| d.tenant_id.as_str()).collect();

        let mut names: HashMap<(String, String), String> = HashMap::new();
        for tenant in tenants {
            match self.store.exchange_configs(tenant).await {
                Ok(exchanges) => names.extend(
                    exchanges
                        .into_iter()
                        .map(|e| ((e.tenant_id, e.id), e.name)),
                ),
                Err(e) => warn!(tenant_id = %tenant, error = %e, "failed to read exchanges"),
            }
        }

        for definition in wanted {
            let key = (definition.tenant_id.clone(), definition.exchange_id.clone());
            if let Some(name) = names.get(&key) {
                labels.insert(definition.id.clone(), name.clone());
            }
        }
        labels
    }
}
