pub mod cli;
pub mod config;
pub mod error;
pub mod fleet;
pub mod resolver;
pub mod store;
pub mod tenancy;
pub mod worker;

pub use config::AppConfig;
pub use error::{FleetError, Result};
pub use fleet::{
    FleetController, FleetMode, FleetSnapshot, FleetViews, StartOutcome, TenantScope,
    WorkerRegistry, WorkerState, WorkerSummary,
};
pub use resolver::{ConfigResolver, ResolvedWorkerConfig, RiskSettings};
pub use store::{ConfigStore, MemoryConfigStore, PostgresConfigStore};
pub use tenancy::TenancyResolver;
pub use worker::{AccountSnapshot, StopSignal, Worker, WorkerFactory, WorkerStatus};
