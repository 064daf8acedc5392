//! Persisted configuration store
//!
//! The orchestrator only reads definitions, credentials and system settings,
//! and writes back a worker's run flag. Schema and migrations belong to the
//! owning service.

pub mod memory;
pub mod postgres;
pub mod records;

use async_trait::async_trait;

use crate::error::Result;

pub use memory::MemoryConfigStore;
pub use postgres::PostgresConfigStore;
pub use records::{ExchangeConfig, ProviderConfig, Secret, WorkerDefinition};

/// System setting keys read by the orchestrator
pub mod keys {
    pub const MULTI_USER_MODE: &str = "multi_user_mode";
    pub const ADMIN_MODE: &str = "admin_mode";
    pub const COIN_POOL_API_URL: &str = "coin_pool_api_url";
    pub const MAX_DAILY_LOSS: &str = "max_daily_loss";
    pub const MAX_DRAWDOWN: &str = "max_drawdown";
    pub const STOP_TRADING_MINUTES: &str = "stop_trading_minutes";
    pub const BTC_ETH_LEVERAGE: &str = "btc_eth_leverage";
    pub const ALTCOIN_LEVERAGE: &str = "altcoin_leverage";
}

/// Read/write contract the orchestrator needs from persisted configuration
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Worker definitions owned by one tenant
    async fn worker_definitions(&self, tenant_id: &str) -> Result<Vec<WorkerDefinition>>;

    /// Worker definitions of every tenant (fleet-wide mode)
    async fn all_worker_definitions(&self) -> Result<Vec<WorkerDefinition>>;

    async fn provider_configs(&self, tenant_id: &str) -> Result<Vec<ProviderConfig>>;

    async fn exchange_configs(&self, tenant_id: &str) -> Result<Vec<ExchangeConfig>>;

    /// A global system setting; `None` when the key is absent
    async fn system_setting(&self, key: &str) -> Result<Option<String>>;

    /// Persist the "should be running" flag of one worker
    async fn set_worker_run_flag(&self, tenant_id: &str, worker_id: &str, running: bool)
        -> Result<()>;
}
