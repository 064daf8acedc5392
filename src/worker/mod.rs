//! Worker contract
//!
//! A worker is one independently scheduled trading bot. The orchestrator
//! never looks inside it: it constructs it from a resolved config, runs
//! `run()` on its own task, signals it to stop, and polls its status and
//! account snapshot.

pub mod paper;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

use crate::error::Result;
use crate::resolver::ResolvedWorkerConfig;

pub use paper::{PaperWorker, PaperWorkerFactory};

/// Point-in-time run status reported by a worker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStatus {
    pub is_running: bool,
    /// Decision cycles completed since construction
    pub call_count: u64,
}

/// Point-in-time account view reported by a worker
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub total_equity: Decimal,
    pub total_pnl: Decimal,
    pub total_pnl_pct: Decimal,
    pub position_count: usize,
    pub margin_used_pct: Decimal,
}

/// Receiving end of a worker's cancellation channel.
///
/// The registry entry owns the sender; `run()` should return soon after
/// `stopped()` resolves.
#[derive(Debug, Clone)]
pub struct StopSignal {
    rx: watch::Receiver<bool>,
}

impl StopSignal {
    pub fn new(rx: watch::Receiver<bool>) -> Self {
        Self { rx }
    }

    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once stop is signalled or the sender is gone
    pub async fn stopped(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

/// Independently scheduled polling worker.
///
/// `run()` is invoked on its own tokio task and blocks for the life of that
/// task. `stop()` must be idempotent and must not block.
#[async_trait]
pub trait Worker: Send + Sync + 'static {
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    /// Label of the AI model driving decisions
    fn ai_model_label(&self) -> &str;

    /// Main loop. Returns on stop or on a fatal internal error.
    async fn run(&self, stop: StopSignal) -> Result<()>;

    fn stop(&self) -> Result<()>;

    fn status(&self) -> WorkerStatus;

    async fn account_info(&self) -> Result<AccountSnapshot>;

    /// Called at construction time only, when the definition carries one
    fn set_custom_prompt(&self, _prompt: &str) {}

    fn set_override_base_prompt(&self, _override_base: bool) {}
}

/// Builds workers from resolved configs
pub trait WorkerFactory: Send + Sync {
    fn build(&self, config: &ResolvedWorkerConfig) -> Result<Arc<dyn Worker>>;
}
