//! Global risk settings, parsed from string-valued system settings

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

use crate::store::{keys, ConfigStore};

pub const DEFAULT_MAX_DAILY_LOSS: Decimal = dec!(10.0);
pub const DEFAULT_MAX_DRAWDOWN: Decimal = dec!(20.0);
pub const DEFAULT_STOP_TRADING_MINUTES: u64 = 60;
pub const DEFAULT_LEVERAGE: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskSettings {
    /// Max daily loss (percent of equity)
    pub max_daily_loss: Decimal,
    /// Max drawdown (percent of equity)
    pub max_drawdown: Decimal,
    /// How long trading pauses after a risk limit trips. Negative or
    /// unparsable settings keep the 60 minute default rather than pausing
    /// for a negative span.
    pub stop_trading_minutes: u64,
    /// Leverage for BTC/ETH
    pub btc_eth_leverage: u32,
    /// Leverage for every other asset
    pub altcoin_leverage: u32,
    pub coin_pool_url: Option<String>,
}

impl Default for RiskSettings {
    fn default() -> Self {
        Self {
            max_daily_loss: DEFAULT_MAX_DAILY_LOSS,
            max_drawdown: DEFAULT_MAX_DRAWDOWN,
            stop_trading_minutes: DEFAULT_STOP_TRADING_MINUTES,
            btc_eth_leverage: DEFAULT_LEVERAGE,
            altcoin_leverage: DEFAULT_LEVERAGE,
            coin_pool_url: None,
        }
    }
}

impl RiskSettings {
    /// Build settings from a key lookup. Absent or unparsable values keep the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            max_daily_loss: lookup(keys::MAX_DAILY_LOSS)
                .and_then(|v| parse_decimal(&v))
                .unwrap_or(defaults.max_daily_loss),
            max_drawdown: lookup(keys::MAX_DRAWDOWN)
                .and_then(|v| parse_decimal(&v))
                .unwrap_or(defaults.max_drawdown),
            stop_trading_minutes: lookup(keys::STOP_TRADING_MINUTES)
                .and_then(|v| v.trim().parse::<i64>().ok())
                .filter(|m| *m >= 0)
                .map(|m| m as u64)
                .unwrap_or(defaults.stop_trading_minutes),
            btc_eth_leverage: lookup(keys::BTC_ETH_LEVERAGE)
                .and_then(|v| parse_leverage(&v))
                .unwrap_or(defaults.btc_eth_leverage),
            altcoin_leverage: lookup(keys::ALTCOIN_LEVERAGE)
                .and_then(|v| parse_leverage(&v))
                .unwrap_or(defaults.altcoin_leverage),
            coin_pool_url: lookup(keys::COIN_POOL_API_URL)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
        }
    }

    /// Read the current settings from the store. A failed read counts as absent.
    pub async fn load(store: &dyn ConfigStore) -> Self {
        let names = [
            keys::MAX_DAILY_LOSS,
            keys::MAX_DRAWDOWN,
            keys::STOP_TRADING_MINUTES,
            keys::BTC_ETH_LEVERAGE,
            keys::ALTCOIN_LEVERAGE,
            keys::COIN_POOL_API_URL,
        ];

        let mut values = std::collections::HashMap::new();
        for key in names {
            match store.system_setting(key).await {
                Ok(Some(value)) => {
                    values.insert(key, value);
                }
                Ok(None) => debug!(key, "risk setting absent, using default"),
                Err(e) => warn!(key, error = %e, "failed to read risk setting, using default"),
            }
        }

        Self::from_lookup(|key| values.get(key).cloned())
    }

    pub fn stop_trading_duration(&self) -> Duration {
        Duration::from_secs(self.stop_trading_minutes * 60)
    }
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

/// Zero or negative leverage is invalid
fn parse_leverage(raw: &str) -> Option<u32> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|v| *v > 0)
        .and_then(|v| u32::try_from(v).ok())
}
