//! Registry entry for one live worker
//!
//! Owns the worker's cancellation channel and the supervised run task, so
//! `stop` always has a concrete signal to send.

use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::state::StartOutcome;
use crate::error::{FleetError, Result};
use crate::tenancy::TenancyResolver;
use crate::worker::{StopSignal, Worker, WorkerStatus};

pub struct WorkerHandle {
    worker: Arc<dyn Worker>,
    tenant_id: String,
    /// Tenant was derived from the identifier rather than a definition
    tenant_inferred: bool,
    stop_tx: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl WorkerHandle {
    pub fn new(worker: Arc<dyn Worker>, tenant_id: impl Into<String>) -> Self {
        Self::build(worker, tenant_id.into(), false)
    }

    /// Handle for a worker registered without a definition; the owner is
    /// inferred from its identifier.
    pub fn with_inferred_tenant(worker: Arc<dyn Worker>, tenancy: &TenancyResolver) -> Self {
        let tenant_id = tenancy.owner_of(worker.id());
        Self::build(worker, tenant_id, true)
    }

    fn build(worker: Arc<dyn Worker>, tenant_id: String, tenant_inferred: bool) -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            worker,
            tenant_id,
            tenant_inferred,
            stop_tx,
            task: Mutex::new(None),
        }
    }

    pub fn id(&self) -> &str {
        self.worker.id()
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn tenant_inferred(&self) -> bool {
        self.tenant_inferred
    }

    pub fn worker(&self) -> &Arc<dyn Worker> {
        &self.worker
    }

    pub fn status(&self) -> WorkerStatus {
        self.worker.status()
    }

    /// True while the run task is live or the worker reports itself running
    pub fn is_active(&self) -> bool {
        self.task_live() || self.worker.status().is_running
    }

    fn task_live(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Dispatch `run()` on its own task and return immediately.
    ///
    /// At most one run task exists per handle; while one is live this is a
    /// no-op. Errors from `run()` are logged against the worker id and go
    /// no further.
    pub fn start(&self) -> StartOutcome {
        let mut task = self.task.lock().unwrap_or_else(|e| e.into_inner());

        let live = task.as_ref().is_some_and(|t| !t.is_finished());
        if live || self.worker.status().is_running {
            debug!(worker_id = %self.id(), "start skipped, worker already running");
            return StartOutcome::AlreadyRunning;
        }

        self.stop_tx.send_replace(false);
        let signal = StopSignal::new(self.stop_tx.subscribe());
        let worker = Arc::clone(&self.worker);
        let worker_id = self.id().to_string();

        *task = Some(tokio::spawn(async move {
            info!(worker_id = %worker_id, name = %worker.name(), "starting worker");
            match worker.run(signal).await {
                Ok(()) => info!(worker_id = %worker_id, "worker exited"),
                Err(e) => error!(worker_id = %worker_id, error = %e, "worker run failed"),
            }
        }));

        StartOutcome::Started
    }

    /// Signal the run task and ask the worker to stop. Safe to repeat and
    /// safe to call from any task.
    pub fn stop(&self) -> Result<()> {
        self.stop_tx.send_replace(true);
        self.worker.stop().map_err(|e| FleetError::StopFailed {
            worker_id: self.id().to_string(),
            reason: e.to_string(),
        })
    }
}

impl std::fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("id", &self.id())
            .field("tenant_id", &self.tenant_id)
            .field("tenant_inferred", &self.tenant_inferred)
            .field("task_live", &self.task_live())
            .finish()
    }
}
