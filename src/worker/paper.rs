//! Dry-run worker
//!
//! Ticks on the configured scan interval and counts decision cycles without
//! calling any AI provider or exchange. Lets the orchestrator boot and be
//! exercised end to end without live credentials.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tracing::{debug, info};

use super::{AccountSnapshot, StopSignal, Worker, WorkerFactory, WorkerStatus};
use crate::error::{FleetError, Result};
use crate::resolver::ResolvedWorkerConfig;

pub struct PaperWorker {
    config: ResolvedWorkerConfig,
    running: AtomicBool,
    stop_requested: AtomicBool,
    wake: Notify,
    call_count: AtomicU64,
    custom_prompt: Mutex<Option<String>>,
    override_base_prompt: AtomicBool,
}

impl PaperWorker {
    pub fn new(config: ResolvedWorkerConfig) -> Self {
        Self {
            config,
            running: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
            wake: Notify::new(),
            call_count: AtomicU64::new(0),
            custom_prompt: Mutex::new(None),
            override_base_prompt: AtomicBool::new(false),
        }
    }

    pub fn custom_prompt(&self) -> Option<String> {
        self.custom_prompt
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn overrides_base_prompt(&self) -> bool {
        self.override_base_prompt.load(Ordering::SeqCst)
    }

    fn cycle(&self) {
        let n = self.call_count.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(
            worker_id = %self.config.id,
            cycle = n,
            exchange = %self.config.exchange_kind,
            "paper decision cycle"
        );
    }
}

#[async_trait]
impl Worker for PaperWorker {
    fn id(&self) -> &str {
        &self.config.id
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    fn ai_model_label(&self) -> &str {
        self.config.ai_model_label()
    }

    async fn run(&self, mut stop: StopSignal) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(FleetError::Validation(format!(
                "worker {} is already running",
                self.config.id
            )));
        }
        self.stop_requested.store(false, Ordering::SeqCst);
        info!(
            worker_id = %self.config.id,
            interval_secs = self.config.scan_interval.as_secs(),
            "paper worker started"
        );

        let mut ticker = tokio::time::interval(self.config.scan_interval);
        loop {
            tokio::select! {
                _ = stop.stopped() => break,
                _ = self.wake.notified() => {}
                _ = ticker.tick() => self.cycle(),
            }
            if self.stop_requested.load(Ordering::SeqCst) {
                break;
            }
        }

        self.running.store(false, Ordering::SeqCst);
        info!(worker_id = %self.config.id, "paper worker stopped");
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        self.stop_requested.store(true, Ordering::SeqCst);
        self.wake.notify_waiters();
        Ok(())
    }

    fn status(&self) -> WorkerStatus {
        WorkerStatus {
            is_running: self.running.load(Ordering::SeqCst),
            call_count: self.call_count.load(Ordering::SeqCst),
        }
    }

    async fn account_info(&self) -> Result<AccountSnapshot> {
        Ok(AccountSnapshot {
            total_equity: self.config.initial_balance,
            total_pnl: Decimal::ZERO,
            total_pnl_pct: Decimal::ZERO,
            position_count: 0,
            margin_used_pct: Decimal::ZERO,
        })
    }

    fn set_custom_prompt(&self, prompt: &str) {
        *self.custom_prompt.lock().unwrap_or_else(|e| e.into_inner()) = Some(prompt.to_string());
    }

    fn set_override_base_prompt(&self, override_base: bool) {
        self.override_base_prompt
            .store(override_base, Ordering::SeqCst);
    }
}

/// Builds `PaperWorker`s. Still rejects configs without exchange credentials.
#[derive(Debug, Clone, Copy, Default)]
pub struct PaperWorkerFactory;

impl WorkerFactory for PaperWorkerFactory {
    fn build(&self, config: &ResolvedWorkerConfig) -> Result<Arc<dyn Worker>> {
        config.require_credentials()?;
        Ok(Arc::new(PaperWorker::new(config.clone())))
    }
}
