#![allow(dead_code)]

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use trader_fleet::config::FleetConfig;
use trader_fleet::error::{FleetError, Result};
use trader_fleet::fleet::FleetController;
use trader_fleet::resolver::ResolvedWorkerConfig;
use trader_fleet::store::{
    ExchangeConfig, MemoryConfigStore, ProviderConfig, Secret, WorkerDefinition,
};
use trader_fleet::worker::{AccountSnapshot, StopSignal, Worker, WorkerFactory, WorkerStatus};

/// Worker whose failures are switched on per test
pub struct ScriptedWorker {
    id: String,
    name: String,
    model: String,
    equity: Decimal,
    pub fail_run: AtomicBool,
    pub fail_stop: AtomicBool,
    pub fail_account: AtomicBool,
    pub runs: AtomicUsize,
    pub stops: AtomicUsize,
    pub prompt: Mutex<Option<(String, bool)>>,
    running: AtomicBool,
    stop_requested: AtomicBool,
    wake: Notify,
}

impl ScriptedWorker {
    pub fn new(id: &str) -> Self {
        Self::with(id, "deepseek", dec!(1000))
    }

    pub fn with(id: &str, model: &str, equity: Decimal) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            model: model.to_string(),
            equity,
            fail_run: AtomicBool::new(false),
            fail_stop: AtomicBool::new(false),
            fail_account: AtomicBool::new(false),
            runs: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
            prompt: Mutex::new(None),
            running: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
            wake: Notify::new(),
        }
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Worker for ScriptedWorker {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn ai_model_label(&self) -> &str {
        &self.model
    }

    async fn run(&self, mut stop: StopSignal) -> Result<()> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if self.fail_run.load(Ordering::SeqCst) {
            return Err(FleetError::Internal(format!("{} crashed", self.id)));
        }

        self.stop_requested.store(false, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);
        loop {
            let woken = self.wake.notified();
            if self.stop_requested.load(Ordering::SeqCst) {
                break;
            }
            tokio::select! {
                _ = stop.stopped() => break,
                _ = woken => {}
            }
        }
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.stop_requested.store(true, Ordering::SeqCst);
        self.wake.notify_waiters();
        if self.fail_stop.load(Ordering::SeqCst) {
            return Err(FleetError::Internal("stop rejected".to_string()));
        }
        Ok(())
    }

    fn status(&self) -> WorkerStatus {
        WorkerStatus {
            is_running: self.running.load(Ordering::SeqCst),
            call_count: self.runs.load(Ordering::SeqCst) as u64,
        }
    }

    async fn account_info(&self) -> Result<AccountSnapshot> {
        if self.fail_account.load(Ordering::SeqCst) {
            return Err(FleetError::Internal("exchange unreachable".to_string()));
        }
        Ok(AccountSnapshot {
            total_equity: self.equity,
            total_pnl: Decimal::ZERO,
            total_pnl_pct: Decimal::ZERO,
            position_count: 0,
            margin_used_pct: Decimal::ZERO,
        })
    }

    fn set_custom_prompt(&self, prompt: &str) {
        let mut slot = self.prompt.lock().unwrap();
        let override_base = slot.as_ref().map(|(_, o)| *o).unwrap_or(false);
        *slot = Some((prompt.to_string(), override_base));
    }

    fn set_override_base_prompt(&self, override_base: bool) {
        if let Some((_, o)) = self.prompt.lock().unwrap().as_mut() {
            *o = override_base;
        }
    }
}

/// Factory that keeps every worker it builds so tests can inspect them
#[derive(Default)]
pub struct ScriptedFactory {
    built: Mutex<HashMap<String, Arc<ScriptedWorker>>>,
    reject: Mutex<HashSet<String>>,
    pub builds: AtomicUsize,
}

impl ScriptedFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make construction fail for `worker_id`
    pub fn reject(&self, worker_id: &str) {
        self.reject.lock().unwrap().insert(worker_id.to_string());
    }

    pub fn worker(&self, worker_id: &str) -> Arc<ScriptedWorker> {
        self.built
            .lock()
            .unwrap()
            .get(worker_id)
            .cloned()
            .unwrap_or_else(|| panic!("{} was never built", worker_id))
    }

    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

impl WorkerFactory for ScriptedFactory {
    fn build(&self, config: &ResolvedWorkerConfig) -> Result<Arc<dyn Worker>> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        if self.reject.lock().unwrap().contains(&config.id) {
            return Err(FleetError::WorkerConstruction(format!(
                "{}: exchange handshake failed",
                config.id
            )));
        }
        let worker = Arc::new(ScriptedWorker::with(
            &config.id,
            config.ai_model_label(),
            config.initial_balance,
        ));
        self.built
            .lock()
            .unwrap()
            .insert(config.id.clone(), Arc::clone(&worker));
        Ok(worker)
    }
}

pub fn definition(tenant: &str, id: &str, provider: &str, exchange: &str) -> WorkerDefinition {
    WorkerDefinition {
        id: id.to_string(),
        name: id.to_string(),
        tenant_id: tenant.to_string(),
        provider_id: provider.to_string(),
        exchange_id: exchange.to_string(),
        initial_balance: dec!(1000),
        scan_interval_minutes: 3,
        run_flag: false,
        custom_prompt: String::new(),
        override_base_prompt: false,
        cross_margin: true,
    }
}

pub fn flagged(mut definition: WorkerDefinition) -> WorkerDefinition {
    definition.run_flag = true;
    definition
}

pub fn provider(tenant: &str, id: &str, enabled: bool) -> ProviderConfig {
    ProviderConfig {
        id: id.to_string(),
        tenant_id: tenant.to_string(),
        name: "DeepSeek".to_string(),
        kind: "deepseek".to_string(),
        enabled,
        api_key: Secret::new("sk-test"),
    }
}

pub fn exchange(tenant: &str, id: &str, enabled: bool) -> ExchangeConfig {
    ExchangeConfig {
        id: id.to_string(),
        tenant_id: tenant.to_string(),
        name: "Binance Futures".to_string(),
        kind: "binance".to_string(),
        enabled,
        api_key: Secret::new("key"),
        secret_key: Secret::new("secret"),
        ..Default::default()
    }
}

/// Store with provider `p1` and exchange `e1` enabled for each tenant
pub async fn seeded_store(tenants: &[&str]) -> Arc<MemoryConfigStore> {
    let store = Arc::new(MemoryConfigStore::new());
    for tenant in tenants {
        store.put_provider(provider(tenant, "p1", true)).await;
        store.put_exchange(exchange(tenant, "e1", true)).await;
    }
    store
}

pub fn controller(
    store: Arc<MemoryConfigStore>,
    factory: Arc<ScriptedFactory>,
) -> FleetController {
    FleetController::new(store, factory, FleetConfig::default())
}

/// Poll `condition` until it holds or two seconds pass
pub async fn wait_until<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..400 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
