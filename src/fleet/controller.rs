//! Fleet lifecycle controller
//!
//! Loads workers from the persisted store into the registry, starts and
//! stops them, and restores the ones whose run flag is set. One instance is
//! shared by the binary and any outer API layer.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::handle::WorkerHandle;
use super::registry::WorkerRegistry;
use super::state::{
    FleetMode, LoadFailure, LoadReport, RestoreReport, StartOutcome, TenantScope, WorkerState,
};
use super::views::FleetViews;
use crate::config::FleetConfig;
use crate::error::{FleetError, Result};
use crate::resolver::{
    ConfigResolver, Resolution, ResolvedWorkerConfig, RiskSettings, SkippedDefinition,
};
use crate::store::{keys, ConfigStore, WorkerDefinition};
use crate::tenancy::TenancyResolver;
use crate::worker::WorkerFactory;

pub struct FleetController {
    store: Arc<dyn ConfigStore>,
    registry: Arc<WorkerRegistry>,
    factory: Arc<dyn WorkerFactory>,
    tenancy: TenancyResolver,
    config: FleetConfig,
}

impl FleetController {
    pub fn new(
        store: Arc<dyn ConfigStore>,
        factory: Arc<dyn WorkerFactory>,
        config: FleetConfig,
    ) -> Self {
        Self::with_registry(store, Arc::new(WorkerRegistry::new()), factory, config)
    }

    pub fn with_registry(
        store: Arc<dyn ConfigStore>,
        registry: Arc<WorkerRegistry>,
        factory: Arc<dyn WorkerFactory>,
        config: FleetConfig,
    ) -> Self {
        let tenancy = TenancyResolver::new(config.legacy_tenant.clone());
        Self {
            store,
            registry,
            factory,
            tenancy,
            config,
        }
    }

    pub fn registry(&self) -> &Arc<WorkerRegistry> {
        &self.registry
    }

    pub fn tenancy(&self) -> &TenancyResolver {
        &self.tenancy
    }

    pub fn views(&self) -> FleetViews {
        FleetViews::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.store),
            self.tenancy.clone(),
        )
    }

    /// Decide the deployment mode from the persisted switches.
    ///
    /// `multi_user_mode = "true"` manages every tenant. Otherwise a single
    /// tenant is managed: the admin tenant unless `admin_mode = "false"`,
    /// in which case the legacy tenant.
    pub async fn fleet_mode(&self) -> Result<FleetMode> {
        let multi_user = self.store.system_setting(keys::MULTI_USER_MODE).await?;
        if multi_user.as_deref().map(str::trim) == Some("true") {
            return Ok(FleetMode::FleetWide);
        }

        let admin_mode = self.store.system_setting(keys::ADMIN_MODE).await?;
        let tenant = if admin_mode.as_deref().map(str::trim) == Some("false") {
            self.config.legacy_tenant.clone()
        } else {
            self.config.admin_tenant.clone()
        };
        Ok(FleetMode::SingleTenant(tenant))
    }

    async fn definitions_in(&self, scope: &TenantScope) -> Result<Vec<WorkerDefinition>> {
        match scope {
            TenantScope::All => self.store.all_worker_definitions().await,
            TenantScope::Tenant(tenant) => self.store.worker_definitions(tenant).await,
        }
    }

    /// Resolve every definition in scope against its tenant's providers and
    /// exchanges.
    ///
    /// Failing to read the definitions is fatal. Failing to read one tenant's
    /// providers or exchanges skips that tenant's definitions only.
    #[instrument(skip(self))]
    pub async fn resolve_scope(&self, scope: &TenantScope) -> Result<Resolution> {
        let definitions = self.definitions_in(scope).await?;
        let risk = RiskSettings::load(self.store.as_ref()).await;

        let mut by_tenant: BTreeMap<String, Vec<WorkerDefinition>> = BTreeMap::new();
        for definition in definitions {
            by_tenant
                .entry(definition.tenant_id.clone())
                .or_default()
                .push(definition);
        }

        let mut resolution = Resolution::default();
        for (tenant, definitions) in by_tenant {
            let lookups = async {
                let providers = self.store.provider_configs(&tenant).await?;
                let exchanges = self.store.exchange_configs(&tenant).await?;
                Ok::<_, FleetError>((providers, exchanges))
            };

            match lookups.await {
                Ok((providers, exchanges)) => {
                    resolution.extend(ConfigResolver::resolve(
                        &definitions,
                        &providers,
                        &exchanges,
                        &risk,
                    ));
                }
                Err(e) => {
                    warn!(tenant_id = %tenant, error = %e, "failed to read tenant configs, skipping its workers");
                    resolution
                        .skipped
                        .extend(definitions.into_iter().map(|d| SkippedDefinition {
                            worker_id: d.id,
                            tenant_id: d.tenant_id,
                            reason: e.to_string(),
                        }));
                }
            }
        }
        Ok(resolution)
    }

    /// Construct a worker from a resolved config and register it.
    ///
    /// Fails with `DuplicateId` when the id is already registered, leaving
    /// the existing worker untouched, and with `UnsupportedExchange` when the
    /// exchange kind has no credential mapping, whatever the factory.
    pub async fn load(&self, config: ResolvedWorkerConfig) -> Result<()> {
        if self.registry.contains(&config.id).await {
            return Err(FleetError::DuplicateId(config.id));
        }
        config.require_credentials()?;

        let worker = self.factory.build(&config)?;
        if let Some(prompt) = &config.custom_prompt {
            worker.set_custom_prompt(prompt);
            worker.set_override_base_prompt(config.override_base_prompt);
            debug!(
                worker_id = %config.id,
                override_base = config.override_base_prompt,
                "applied custom prompt"
            );
        }

        self.registry
            .add(WorkerHandle::new(worker, config.tenant_id.clone()))
            .await?;
        info!(
            worker_id = %config.id,
            tenant_id = %config.tenant_id,
            model = %config.provider_kind,
            exchange = %config.exchange_kind,
            "worker loaded"
        );
        Ok(())
    }

    /// Resolve and load every definition in scope.
    ///
    /// Per-item problems land in the report; only a failure to read the
    /// definitions themselves is returned as an error.
    #[instrument(skip(self))]
    pub async fn load_scope(&self, scope: &TenantScope) -> Result<LoadReport> {
        let resolution = self.resolve_scope(scope).await?;
        let mut report = LoadReport {
            skipped: resolution.skipped,
            ..Default::default()
        };

        for config in resolution.configs {
            let worker_id = config.id.clone();
            let tenant_id = config.tenant_id.clone();
            match self.load(config).await {
                Ok(()) => report.loaded.push(worker_id),
                Err(FleetError::DuplicateId(id)) => {
                    debug!(worker_id = %id, "already loaded");
                    report.already_loaded.push(id);
                }
                Err(e) if e.is_resolution() => {
                    warn!(worker_id = %worker_id, "skipping worker: {}", e);
                    report.skipped.push(SkippedDefinition {
                        worker_id,
                        tenant_id,
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    warn!(worker_id = %worker_id, error = %e, "failed to load worker");
                    report.failed.push(LoadFailure {
                        worker_id,
                        tenant_id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            %scope,
            loaded = report.loaded.len(),
            skipped = report.skipped.len(),
            already_loaded = report.already_loaded.len(),
            failed = report.failed.len(),
            "load finished"
        );
        Ok(report)
    }

    /// Boot-time load for the persisted deployment mode
    pub async fn load_from_store(&self) -> Result<LoadReport> {
        let mode = self.fleet_mode().await?;
        info!(%mode, "loading workers");
        self.load_scope(&mode.scope()).await
    }

    /// Load one tenant's workers on demand. Ids already present are reported
    /// as already loaded.
    pub async fn load_tenant(&self, tenant_id: &str) -> Result<LoadReport> {
        self.load_scope(&TenantScope::tenant(tenant_id)).await
    }

    pub async fn start(&self, worker_id: &str) -> Result<StartOutcome> {
        let handle = self.registry.get(worker_id).await?;
        let outcome = handle.start();
        if outcome == StartOutcome::Started {
            info!(worker_id, "worker started");
        }
        Ok(outcome)
    }

    pub async fn stop(&self, worker_id: &str) -> Result<()> {
        self.registry.get(worker_id).await?.stop()?;
        info!(worker_id, "worker stop requested");
        Ok(())
    }

    pub async fn remove(&self, worker_id: &str) -> Result<()> {
        self.registry.remove(worker_id).await
    }

    pub async fn state(&self, worker_id: &str) -> WorkerState {
        match self.registry.get(worker_id).await {
            Err(_) => WorkerState::Unloaded,
            Ok(handle) if handle.is_active() => WorkerState::Running,
            Ok(_) => WorkerState::Stopped,
        }
    }

    /// Start every loaded worker whose persisted run flag is set.
    ///
    /// With no scope the persisted deployment mode decides which tenants are
    /// covered. Flagged definitions that are not loaded are reported and
    /// never constructed here. Running it twice starts nothing new.
    #[instrument(skip(self))]
    pub async fn restore_all(&self, scope: Option<&TenantScope>) -> Result<RestoreReport> {
        let scope = match scope {
            Some(scope) => scope.clone(),
            None => self.fleet_mode().await?.scope(),
        };

        let flagged: Vec<WorkerDefinition> = self
            .definitions_in(&scope)
            .await?
            .into_iter()
            .filter(|d| d.run_flag)
            .collect();

        let mut report = RestoreReport {
            eligible: flagged.len(),
            ..Default::default()
        };
        if flagged.is_empty() {
            info!(%scope, "no workers to restore");
            return Ok(report);
        }

        let loaded: HashMap<String, Arc<WorkerHandle>> = self
            .registry
            .list()
            .await
            .into_iter()
            .map(|h| (h.id().to_string(), h))
            .collect();

        for definition in flagged {
            match loaded.get(&definition.id) {
                None => {
                    warn!(worker_id = %definition.id, "flagged to run but not loaded, skipping");
                    report.not_loaded.push(definition.id);
                }
                Some(handle) => match handle.start() {
                    StartOutcome::Started => {
                        info!(worker_id = %definition.id, name = %definition.name, "restored worker");
                        report.started.push(definition.id);
                    }
                    StartOutcome::AlreadyRunning => report.already_running.push(definition.id),
                },
            }
        }

        info!(
            %scope,
            eligible = report.eligible,
            started = report.started.len(),
            not_loaded = report.not_loaded.len(),
            "restore finished"
        );
        Ok(report)
    }

    /// Start every registered worker; returns how many were newly started
    pub async fn start_all(&self) -> usize {
        self.registry
            .list()
            .await
            .iter()
            .filter(|h| h.start() == StartOutcome::Started)
            .count()
    }

    /// Signal every registered worker to stop. Failures are logged per
    /// worker; returns how many stop requests succeeded.
    pub async fn stop_all(&self) -> usize {
        let handles = self.registry.list().await;
        let mut stopped = 0;
        for handle in &handles {
            match handle.stop() {
                Ok(()) => stopped += 1,
                Err(e) => warn!(worker_id = %handle.id(), error = %e, "stop failed"),
            }
        }
        info!(stopped, total = handles.len(), "stop requested for all workers");
        stopped
    }

    /// Persist a tenant's run flag for a worker, then start or stop it.
    ///
    /// The worker must be loaded and owned by `tenant_id`. When the write
    /// fails the worker is left as it was.
    pub async fn set_running(
        &self,
        tenant_id: &str,
        worker_id: &str,
        running: bool,
    ) -> Result<Option<StartOutcome>> {
        let handle = self.registry.get(worker_id).await?;
        let owned = if handle.tenant_inferred() {
            self.tenancy.belongs_to(worker_id, tenant_id)
        } else {
            handle.tenant_id() == tenant_id
        };
        if !owned {
            return Err(FleetError::WorkerNotFound(worker_id.to_string()));
        }

        self.store
            .set_worker_run_flag(tenant_id, worker_id, running)
            .await?;

        if running {
            Ok(Some(handle.start()))
        } else {
            handle.stop()?;
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ExchangeConfig, MemoryConfigStore, ProviderConfig, Secret};
    use crate::worker::PaperWorkerFactory;
    use rust_decimal_macros::dec;

    fn definition(tenant: &str, id: &str, run_flag: bool) -> WorkerDefinition {
        WorkerDefinition {
            id: id.into(),
            name: id.into(),
            tenant_id: tenant.into(),
            provider_id: "p1".into(),
            exchange_id: "e1".into(),
            initial_balance: dec!(1000),
            scan_interval_minutes: 3,
            run_flag,
            custom_prompt: String::new(),
            override_base_prompt: false,
            cross_margin: true,
        }
    }

    async fn seeded(tenant: &str) -> Arc<MemoryConfigStore> {
        let store = Arc::new(MemoryConfigStore::new());
        store
            .put_provider(ProviderConfig {
                id: "p1".into(),
                tenant_id: tenant.into(),
                name: "DeepSeek".into(),
                kind: "deepseek".into(),
                enabled: true,
                api_key: Secret::new("sk"),
            })
            .await;
        store
            .put_exchange(ExchangeConfig {
                id: "e1".into(),
                tenant_id: tenant.into(),
                name: "Binance".into(),
                kind: "binance".into(),
                enabled: true,
                api_key: Secret::new("k"),
                secret_key: Secret::new("s"),
                ..Default::default()
            })
            .await;
        store
    }

    fn controller(store: Arc<MemoryConfigStore>) -> FleetController {
        FleetController::new(store, Arc::new(PaperWorkerFactory), FleetConfig::default())
    }

    #[tokio::test]
    async fn test_fleet_mode_defaults_to_admin_tenant() {
        let store = Arc::new(MemoryConfigStore::new());
        let fleet = controller(store.clone());
        assert_eq!(
            fleet.fleet_mode().await.unwrap(),
            FleetMode::SingleTenant("admin".into())
        );

        store.set_setting(keys::ADMIN_MODE, "false").await;
        assert_eq!(
            fleet.fleet_mode().await.unwrap(),
            FleetMode::SingleTenant("default".into())
        );

        store.set_setting(keys::MULTI_USER_MODE, "true").await;
        assert_eq!(fleet.fleet_mode().await.unwrap(), FleetMode::FleetWide);
    }

    #[tokio::test]
    async fn test_load_tenant_reports_already_loaded() {
        let store = seeded("alice").await;
        store.put_definition(definition("alice", "alice_w1", false)).await;
        let fleet = controller(store);

        let first = fleet.load_tenant("alice").await.unwrap();
        assert_eq!(first.loaded, vec!["alice_w1".to_string()]);

        let second = fleet.load_tenant("alice").await.unwrap();
        assert!(second.loaded.is_empty());
        assert_eq!(second.already_loaded, vec!["alice_w1".to_string()]);
        assert_eq!(fleet.registry().len().await, 1);
    }

    #[tokio::test]
    async fn test_state_transitions() {
        let store = seeded("alice").await;
        store.put_definition(definition("alice", "alice_w1", false)).await;
        let fleet = controller(store);

        assert_eq!(fleet.state("alice_w1").await, WorkerState::Unloaded);
        fleet.load_tenant("alice").await.unwrap();
        assert_eq!(fleet.state("alice_w1").await, WorkerState::Stopped);

        assert_eq!(fleet.start("alice_w1").await.unwrap(), StartOutcome::Started);
        assert_eq!(fleet.state("alice_w1").await, WorkerState::Running);

        fleet.remove("alice_w1").await.unwrap();
        assert_eq!(fleet.state("alice_w1").await, WorkerState::Unloaded);
    }

    #[tokio::test]
    async fn test_set_running_rejects_other_tenant() {
        let store = seeded("alice").await;
        store.put_definition(definition("alice", "alice_w1", false)).await;
        let fleet = controller(store.clone());
        fleet.load_tenant("alice").await.unwrap();

        let err = fleet.set_running("bob", "alice_w1", true).await.unwrap_err();
        assert!(matches!(err, FleetError::WorkerNotFound(_)));
        assert_eq!(store.run_flag("alice", "alice_w1").await, Some(false));
    }
}
