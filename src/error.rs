use thiserror::Error;

/// Main error type for the fleet orchestrator
#[derive(Error, Debug)]
pub enum FleetError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Registry errors
    #[error("Worker ID '{0}' is already registered")]
    DuplicateId(String),

    #[error("Worker ID '{0}' is not registered")]
    WorkerNotFound(String),

    #[error("Query failed for worker {worker_id}: {reason}")]
    QueryFailed { worker_id: String, reason: String },

    // Resolution errors
    #[error("Worker {worker_id}: {kind} '{dependency_id}' does not exist")]
    MissingDependency {
        worker_id: String,
        kind: DependencyKind,
        dependency_id: String,
    },

    #[error("Worker {worker_id}: {kind} '{dependency_id}' is disabled")]
    DisabledDependency {
        worker_id: String,
        kind: DependencyKind,
        dependency_id: String,
    },

    #[error("Worker {worker_id}: exchange kind '{kind}' has no credential mapping")]
    UnsupportedExchange { worker_id: String, kind: String },

    #[error("Worker construction failed: {0}")]
    WorkerConstruction(String),

    // Lifecycle errors
    #[error("Stop failed for worker {worker_id}: {reason}")]
    StopFailed { worker_id: String, reason: String },

    // Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for FleetError
pub type Result<T> = std::result::Result<T, FleetError>;

/// Which referenced configuration a worker definition failed to resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyKind {
    Provider,
    Exchange,
}

impl std::fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DependencyKind::Provider => write!(f, "AI provider"),
            DependencyKind::Exchange => write!(f, "exchange"),
        }
    }
}

impl FleetError {
    /// True for per-definition resolution problems that batch loads skip over
    pub fn is_resolution(&self) -> bool {
        matches!(
            self,
            FleetError::MissingDependency { .. }
                | FleetError::DisabledDependency { .. }
                | FleetError::UnsupportedExchange { .. }
        )
    }
}
