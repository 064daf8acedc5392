use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::store::{ExchangeConfig, Secret};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeKind {
    Binance,
    Hyperliquid,
    Aster,
    /// Stored kind with no credential mapping
    Other(String),
}

impl ExchangeKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Binance => "binance",
            Self::Hyperliquid => "hyperliquid",
            Self::Aster => "aster",
            Self::Other(raw) => raw.as_str(),
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Other(_))
    }

    /// Select the credential fields this exchange kind uses.
    ///
    /// Unknown kinds get `ExchangeCredentials::None`; building a worker from
    /// such a config fails instead of running with empty keys.
    pub fn credentials_from(&self, exchange: &ExchangeConfig) -> ExchangeCredentials {
        match self {
            Self::Binance => ExchangeCredentials::ApiKey {
                api_key: exchange.api_key.clone(),
                secret_key: exchange.secret_key.clone(),
            },
            // Hyperliquid stores the signing key in the api_key column
            Self::Hyperliquid => ExchangeCredentials::Wallet {
                private_key: exchange.api_key.clone(),
                wallet_address: exchange.wallet_address.clone(),
            },
            Self::Aster => ExchangeCredentials::Signer {
                user: exchange.aster_user.clone(),
                signer: exchange.aster_signer.clone(),
                private_key: exchange.aster_private_key.clone(),
            },
            Self::Other(_) => ExchangeCredentials::None,
        }
    }
}

impl std::fmt::Display for ExchangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for ExchangeKind {
    fn from(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "binance" => Self::Binance,
            "hyperliquid" => Self::Hyperliquid,
            "aster" => Self::Aster,
            other => Self::Other(other.to_string()),
        }
    }
}

impl FromStr for ExchangeKind {
    type Err = std::convert::Infallible;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::from(raw))
    }
}

/// Credential set handed to a worker, shaped by exchange kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeCredentials {
    ApiKey {
        api_key: Secret,
        secret_key: Secret,
    },
    Wallet {
        private_key: Secret,
        wallet_address: String,
    },
    Signer {
        user: String,
        signer: String,
        private_key: Secret,
    },
    None,
}

impl ExchangeCredentials {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    DeepSeek,
    Qwen,
    Other(String),
}

impl ProviderKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::DeepSeek => "deepseek",
            Self::Qwen => "qwen",
            Self::Other(raw) => raw.as_str(),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for ProviderKind {
    fn from(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "deepseek" => Self::DeepSeek,
            "qwen" => Self::Qwen,
            other => Self::Other(other.to_string()),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = std::convert::Infallible;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::from(raw))
    }
}
