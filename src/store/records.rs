//! Persisted configuration entities as read from the config store

use rust_decimal::Decimal;
use std::time::Duration;
use zeroize::Zeroizing;

/// Scan interval used when a definition carries a non-positive value
pub const DEFAULT_SCAN_INTERVAL_MINUTES: i64 = 3;

/// Credential material. Wiped on drop and never printed by `Debug`.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secret(Zeroizing<String>);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            write!(f, "Secret(<empty>)")
        } else {
            write!(f, "Secret(<redacted>)")
        }
    }
}

/// A tenant-owned worker definition (`traders` row)
#[derive(Debug, Clone)]
pub struct WorkerDefinition {
    pub id: String,
    pub name: String,
    pub tenant_id: String,
    pub provider_id: String,
    pub exchange_id: String,
    pub initial_balance: Decimal,
    pub scan_interval_minutes: i64,
    /// Persisted "should be running" flag
    pub run_flag: bool,
    pub custom_prompt: String,
    pub override_base_prompt: bool,
    pub cross_margin: bool,
}

impl WorkerDefinition {
    pub fn scan_interval(&self) -> Duration {
        let minutes = if self.scan_interval_minutes > 0 {
            self.scan_interval_minutes
        } else {
            DEFAULT_SCAN_INTERVAL_MINUTES
        };
        Duration::from_secs(minutes as u64 * 60)
    }

    pub fn has_custom_prompt(&self) -> bool {
        !self.custom_prompt.trim().is_empty()
    }
}

/// AI-provider credentials (`ai_models` row)
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    /// Provider kind as stored, e.g. `deepseek` or `qwen`
    pub kind: String,
    pub enabled: bool,
    pub api_key: Secret,
}

/// Exchange credentials (`exchanges` row). Which fields are meaningful
/// depends on `kind`.
#[derive(Debug, Clone, Default)]
pub struct ExchangeConfig {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    /// Exchange kind as stored, e.g. `binance`, `hyperliquid`, `aster`
    pub kind: String,
    pub enabled: bool,
    pub api_key: Secret,
    pub secret_key: Secret,
    pub testnet: bool,
    pub wallet_address: String,
    pub aster_user: String,
    pub aster_signer: String,
    pub aster_private_key: Secret,
}
