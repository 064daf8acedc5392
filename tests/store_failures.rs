mod common;

use async_trait::async_trait;
use mockall::mock;
use rust_decimal_macros::dec;
use std::sync::Arc;

use common::{definition, exchange, provider, ScriptedFactory, ScriptedWorker};
use trader_fleet::config::FleetConfig;
use trader_fleet::error::{FleetError, Result};
use trader_fleet::fleet::{FleetController, TenantScope, WorkerHandle, WorkerRegistry, UNKNOWN_EXCHANGE};
use trader_fleet::store::{ConfigStore, ExchangeConfig, ProviderConfig, WorkerDefinition};

mock! {
    pub Store {}

    #[async_trait]
    impl ConfigStore for Store {
        async fn worker_definitions(&self, tenant_id: &str) -> Result<Vec<WorkerDefinition>>;
        async fn all_worker_definitions(&self) -> Result<Vec<WorkerDefinition>>;
        async fn provider_configs(&self, tenant_id: &str) -> Result<Vec<ProviderConfig>>;
        async fn exchange_configs(&self, tenant_id: &str) -> Result<Vec<ExchangeConfig>>;
        async fn system_setting(&self, key: &str) -> Result<Option<String>>;
        async fn set_worker_run_flag(
            &self,
            tenant_id: &str,
            worker_id: &str,
            running: bool,
        ) -> Result<()>;
    }
}

fn unavailable() -> FleetError {
    FleetError::Internal("connection reset".to_string())
}

fn fleet(store: MockStore, registry: Arc<WorkerRegistry>) -> FleetController {
    FleetController::with_registry(
        Arc::new(store),
        registry,
        ScriptedFactory::new(),
        FleetConfig::default(),
    )
}

#[tokio::test]
async fn one_tenants_lookup_failure_skips_only_that_tenant() {
    let mut store = MockStore::new();
    store.expect_all_worker_definitions().returning(|| {
        Ok(vec![
            definition("alice", "alice_w1", "p1", "e1"),
            definition("bob", "bob_w1", "p1", "e1"),
        ])
    });
    store.expect_system_setting().returning(|_| Ok(None));
    store.expect_provider_configs().returning(|tenant| {
        if tenant == "bob" {
            Err(unavailable())
        } else {
            Ok(vec![provider(tenant, "p1", true)])
        }
    });
    store
        .expect_exchange_configs()
        .returning(|tenant| Ok(vec![exchange(tenant, "e1", true)]));

    let fleet = fleet(store, Arc::new(WorkerRegistry::new()));
    let report = fleet.load_scope(&TenantScope::All).await.unwrap();

    assert_eq!(report.loaded, vec!["alice_w1".to_string()]);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].worker_id, "bob_w1");
    assert!(report.skipped[0].reason.contains("connection reset"));
}

#[tokio::test]
async fn unreadable_risk_settings_fall_back_to_defaults() {
    let mut store = MockStore::new();
    store
        .expect_worker_definitions()
        .returning(|tenant| Ok(vec![definition(tenant, "alice_w1", "p1", "e1")]));
    store.expect_system_setting().returning(|_| Err(unavailable()));
    store
        .expect_provider_configs()
        .returning(|tenant| Ok(vec![provider(tenant, "p1", true)]));
    store
        .expect_exchange_configs()
        .returning(|tenant| Ok(vec![exchange(tenant, "e1", true)]));

    let fleet = fleet(store, Arc::new(WorkerRegistry::new()));
    let resolution = fleet
        .resolve_scope(&TenantScope::tenant("alice"))
        .await
        .unwrap();

    assert_eq!(resolution.configs.len(), 1);
    let risk = &resolution.configs[0].risk;
    assert_eq!(risk.max_daily_loss, dec!(10));
    assert_eq!(risk.btc_eth_leverage, 5);
}

#[tokio::test]
async fn unreadable_mode_switch_fails_the_boot_load() {
    let mut store = MockStore::new();
    store.expect_system_setting().returning(|_| Err(unavailable()));

    let fleet = fleet(store, Arc::new(WorkerRegistry::new()));
    assert!(fleet.load_from_store().await.is_err());
}

#[tokio::test]
async fn unreadable_definitions_disable_the_stale_filter() {
    let registry = Arc::new(WorkerRegistry::new());
    let worker = Arc::new(ScriptedWorker::new("alice_w1"));
    registry
        .add(WorkerHandle::new(worker, "alice"))
        .await
        .unwrap();

    let mut store = MockStore::new();
    store
        .expect_worker_definitions()
        .returning(|_| Err(unavailable()));

    let fleet = fleet(store, registry);
    let snapshot = fleet
        .views()
        .snapshot(&TenantScope::tenant("alice"))
        .await
        .unwrap();

    assert_eq!(snapshot.count, 1);
    assert_eq!(snapshot.workers[0].exchange, UNKNOWN_EXCHANGE);
}

#[tokio::test]
async fn failed_flag_write_leaves_the_worker_stopped() {
    let registry = Arc::new(WorkerRegistry::new());
    let worker = Arc::new(ScriptedWorker::new("alice_w1"));
    registry
        .add(WorkerHandle::new(worker.clone(), "alice"))
        .await
        .unwrap();

    let mut store = MockStore::new();
    store
        .expect_set_worker_run_flag()
        .times(1)
        .returning(|_, _, _| Err(unavailable()));

    let fleet = fleet(store, registry);
    assert!(fleet.set_running("alice", "alice_w1", true).await.is_err());

    tokio::task::yield_now().await;
    assert_eq!(worker.runs(), 0);
}
