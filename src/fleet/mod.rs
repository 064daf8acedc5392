//! Fleet orchestration
//!
//! The registry of live workers, the controller that loads, starts, stops
//! and restores them, and the read-only views over them.

pub mod controller;
pub mod handle;
pub mod registry;
pub mod state;
pub mod views;

pub use controller::FleetController;
pub use handle::WorkerHandle;
pub use registry::WorkerRegistry;
pub use state::{
    FleetMode, LoadFailure, LoadReport, RestoreReport, StartOutcome, TenantScope, WorkerState,
};
pub use views::{FleetSnapshot, FleetViews, WorkerSummary, UNKNOWN_EXCHANGE};
