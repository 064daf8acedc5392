//! In-memory map of live workers, keyed by worker id

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::handle::WorkerHandle;
use crate::error::{FleetError, Result};

#[derive(Debug, Default)]
pub struct WorkerRegistry {
    workers: RwLock<HashMap<String, Arc<WorkerHandle>>>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handle under its worker id.
    ///
    /// The existence check and the insert happen under one write lock, so of
    /// two concurrent adds for the same id exactly one wins.
    pub async fn add(&self, handle: WorkerHandle) -> Result<Arc<WorkerHandle>> {
        let mut workers = self.workers.write().await;
        let id = handle.id().to_string();
        if workers.contains_key(&id) {
            return Err(FleetError::DuplicateId(id));
        }
        let handle = Arc::new(handle);
        workers.insert(id, Arc::clone(&handle));
        Ok(handle)
    }

    pub async fn get(&self, worker_id: &str) -> Result<Arc<WorkerHandle>> {
        self.workers
            .read()
            .await
            .get(worker_id)
            .cloned()
            .ok_or_else(|| FleetError::WorkerNotFound(worker_id.to_string()))
    }

    pub async fn contains(&self, worker_id: &str) -> bool {
        self.workers.read().await.contains_key(worker_id)
    }

    /// Stop the worker if it is active, then drop it from the map.
    ///
    /// Removal happens even when the stop request fails; that failure is
    /// logged and not returned.
    pub async fn remove(&self, worker_id: &str) -> Result<()> {
        let mut workers = self.workers.write().await;
        let handle = workers
            .remove(worker_id)
            .ok_or_else(|| FleetError::WorkerNotFound(worker_id.to_string()))?;

        if handle.is_active() {
            if let Err(e) = handle.stop() {
                warn!(worker_id, error = %e, "stop failed during removal");
            }
        }
        info!(worker_id, "worker removed");
        Ok(())
    }

    /// Snapshot of every handle. The lock is released before returning.
    pub async fn list(&self) -> Vec<Arc<WorkerHandle>> {
        self.workers.read().await.values().cloned().collect()
    }

    pub async fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.workers.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn len(&self) -> usize {
        self.workers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.workers.read().await.is_empty()
    }
}
