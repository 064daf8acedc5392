//! Fleet modes, scopes and batch reports

use serde::{Deserialize, Serialize};

use crate::resolver::SkippedDefinition;

/// Lifecycle state of one worker identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// Not in the registry
    Unloaded,
    /// Registered, run loop not active
    Stopped,
    /// Registered with a live run loop
    Running,
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerState::Unloaded => write!(f, "unloaded"),
            WorkerState::Stopped => write!(f, "stopped"),
            WorkerState::Running => write!(f, "running"),
        }
    }
}

/// Result of a start request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new run task was dispatched
    Started,
    /// A run task is still live; nothing was dispatched
    AlreadyRunning,
}

/// Which tenants a load, restore or snapshot covers
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantScope {
    All,
    Tenant(String),
}

impl TenantScope {
    pub fn tenant(id: impl Into<String>) -> Self {
        Self::Tenant(id.into())
    }
}

impl std::fmt::Display for TenantScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TenantScope::All => write!(f, "all tenants"),
            TenantScope::Tenant(id) => write!(f, "tenant {}", id),
        }
    }
}

/// Deployment mode, decided once from persisted switches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FleetMode {
    /// Manage every tenant's workers
    FleetWide,
    /// Manage one designated tenant's workers
    SingleTenant(String),
}

impl FleetMode {
    pub fn scope(&self) -> TenantScope {
        match self {
            FleetMode::FleetWide => TenantScope::All,
            FleetMode::SingleTenant(tenant) => TenantScope::Tenant(tenant.clone()),
        }
    }
}

impl std::fmt::Display for FleetMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FleetMode::FleetWide => write!(f, "fleet-wide"),
            FleetMode::SingleTenant(tenant) => write!(f, "single-tenant ({})", tenant),
        }
    }
}

/// A resolved config that failed to become a registered worker
#[derive(Debug, Clone)]
pub struct LoadFailure {
    pub worker_id: String,
    pub tenant_id: String,
    pub reason: String,
}

/// Per-item outcome of a batch load
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub loaded: Vec<String>,
    /// Definitions with missing, disabled or unsupported dependencies
    pub skipped: Vec<SkippedDefinition>,
    /// Identifiers already present in the registry
    pub already_loaded: Vec<String>,
    /// Construction failures
    pub failed: Vec<LoadFailure>,
}

/// Per-item outcome of a restore pass
#[derive(Debug, Clone, Default)]
pub struct RestoreReport {
    /// Definitions whose persisted run flag is set
    pub eligible: usize,
    pub started: Vec<String>,
    pub already_running: Vec<String>,
    /// Flagged definitions that are not in the registry
    pub not_loaded: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_scope() {
        assert_eq!(FleetMode::FleetWide.scope(), TenantScope::All);
        assert_eq!(
            FleetMode::SingleTenant("admin".into()).scope(),
            TenantScope::tenant("admin")
        );
        assert_eq!(
            FleetMode::SingleTenant("admin".into()).to_string(),
            "single-tenant (admin)"
        );
    }
}
