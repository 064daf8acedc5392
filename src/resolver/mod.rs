//! Config resolution
//!
//! Joins a tenant's worker definitions with the AI-provider and exchange
//! configs they reference, plus the global risk settings, into
//! ready-to-construct worker configs. Definitions whose dependencies are
//! missing or disabled are skipped with a diagnostic; the rest of the batch
//! still resolves.

pub mod kinds;
pub mod risk;

use rust_decimal::Decimal;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{DependencyKind, FleetError, Result};
use crate::store::{ExchangeConfig, ProviderConfig, Secret, WorkerDefinition};

pub use kinds::{ExchangeCredentials, ExchangeKind, ProviderKind};
pub use risk::RiskSettings;

/// Fully joined configuration for one worker. Never persisted.
#[derive(Debug, Clone)]
pub struct ResolvedWorkerConfig {
    pub id: String,
    pub name: String,
    pub tenant_id: String,
    pub provider_kind: ProviderKind,
    pub provider_api_key: Secret,
    pub exchange_id: String,
    pub exchange_kind: ExchangeKind,
    pub credentials: ExchangeCredentials,
    pub testnet: bool,
    pub initial_balance: Decimal,
    pub scan_interval: Duration,
    pub cross_margin: bool,
    /// Set only when the definition carries a non-empty instruction
    pub custom_prompt: Option<String>,
    pub override_base_prompt: bool,
    pub risk: RiskSettings,
}

impl ResolvedWorkerConfig {
    /// Label shown next to the worker, the provider kind
    pub fn ai_model_label(&self) -> &str {
        self.provider_kind.as_str()
    }

    /// Fail when the exchange kind had no credential mapping
    pub fn require_credentials(&self) -> Result<&ExchangeCredentials> {
        if self.credentials.is_none() {
            return Err(FleetError::UnsupportedExchange {
                worker_id: self.id.clone(),
                kind: self.exchange_kind.to_string(),
            });
        }
        Ok(&self.credentials)
    }
}

/// A definition left out of a resolution batch
#[derive(Debug, Clone)]
pub struct SkippedDefinition {
    pub worker_id: String,
    pub tenant_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub configs: Vec<ResolvedWorkerConfig>,
    pub skipped: Vec<SkippedDefinition>,
}

impl Resolution {
    pub fn extend(&mut self, other: Resolution) {
        self.configs.extend(other.configs);
        self.skipped.extend(other.skipped);
    }
}

/// Stateless resolver; every call is a pure function of its inputs
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigResolver;

impl ConfigResolver {
    /// Resolve a batch of definitions.
    ///
    /// Lookups are keyed by (tenant, id), so a definition never binds to
    /// another tenant's provider or exchange even when the inputs are mixed.
    pub fn resolve(
        definitions: &[WorkerDefinition],
        providers: &[ProviderConfig],
        exchanges: &[ExchangeConfig],
        risk: &RiskSettings,
    ) -> Resolution {
        let providers: HashMap<(&str, &str), &ProviderConfig> = providers
            .iter()
            .map(|p| ((p.tenant_id.as_str(), p.id.as_str()), p))
            .collect();
        let exchanges: HashMap<(&str, &str), &ExchangeConfig> = exchanges
            .iter()
            .map(|e| ((e.tenant_id.as_str(), e.id.as_str()), e))
            .collect();

        let mut resolution = Resolution::default();
        for definition in definitions {
            let tenant = definition.tenant_id.as_str();
            let provider = providers
                .get(&(tenant, definition.provider_id.as_str()))
                .copied();
            let exchange = exchanges
                .get(&(tenant, definition.exchange_id.as_str()))
                .copied();

            match Self::resolve_one(definition, provider, exchange, risk) {
                Ok(config) => {
                    debug!(
                        worker_id = %config.id,
                        provider = %config.provider_kind,
                        exchange = %config.exchange_kind,
                        "resolved worker config"
                    );
                    resolution.configs.push(config);
                }
                Err(e) => {
                    warn!(worker_id = %definition.id, tenant_id = %tenant, "skipping worker: {}", e);
                    resolution.skipped.push(SkippedDefinition {
                        worker_id: definition.id.clone(),
                        tenant_id: definition.tenant_id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        resolution
    }

    fn resolve_one(
        definition: &WorkerDefinition,
        provider: Option<&ProviderConfig>,
        exchange: Option<&ExchangeConfig>,
        risk: &RiskSettings,
    ) -> Result<ResolvedWorkerConfig> {
        let provider = check_dependency(
            definition,
            DependencyKind::Provider,
            &definition.provider_id,
            provider.map(|p| (p, p.enabled)),
        )?;
        let exchange = check_dependency(
            definition,
            DependencyKind::Exchange,
            &definition.exchange_id,
            exchange.map(|e| (e, e.enabled)),
        )?;

        let exchange_kind = ExchangeKind::from(exchange.kind.as_str());
        let provider_kind = ProviderKind::from(provider.kind.as_str());

        let credentials = exchange_kind.credentials_from(exchange);

        Ok(ResolvedWorkerConfig {
            id: definition.id.clone(),
            name: definition.name.clone(),
            tenant_id: definition.tenant_id.clone(),
            provider_kind,
            provider_api_key: provider.api_key.clone(),
            exchange_id: exchange.id.clone(),
            exchange_kind,
            credentials,
            testnet: exchange.testnet,
            initial_balance: definition.initial_balance,
            scan_interval: definition.scan_interval(),
            cross_margin: definition.cross_margin,
            custom_prompt: definition
                .has_custom_prompt()
                .then(|| definition.custom_prompt.clone()),
            override_base_prompt: definition.override_base_prompt,
            risk: risk.clone(),
        })
    }
}

fn check_dependency<'a, T>(
    definition: &WorkerDefinition,
    kind: DependencyKind,
    dependency_id: &str,
    found: Option<(&'a T, bool)>,
) -> Result<&'a T> {
    match found {
        None => Err(FleetError::MissingDependency {
            worker_id: definition.id.clone(),
            kind,
            dependency_id: dependency_id.to_string(),
        }),
        Some((_, false)) => Err(FleetError::DisabledDependency {
            worker_id: definition.id.clone(),
            kind,
            dependency_id: dependency_id.to_string(),
        }),
        Some((value, true)) => Ok(value),
    }
}
