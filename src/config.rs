use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub fleet: FleetConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,
    /// Maximum connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

/// Deployment-level orchestration settings
#[derive(Debug, Clone, Deserialize)]
pub struct FleetConfig {
    /// Tenant loaded in single-tenant mode while `admin_mode` is on
    #[serde(default = "default_admin_tenant")]
    pub admin_tenant: String,
    /// Grandfathered tenant owning identifiers that carry no tenant prefix
    #[serde(default = "default_legacy_tenant")]
    pub legacy_tenant: String,
    /// Restart workers whose persisted run flag is set once loading finishes
    #[serde(default = "default_true")]
    pub restore_on_boot: bool,
}

fn default_admin_tenant() -> String {
    "admin".to_string()
}

fn default_legacy_tenant() -> String {
    "default".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            admin_tenant: default_admin_tenant(),
            legacy_tenant: default_legacy_tenant(),
            restore_on_boot: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            .set_default("database.max_connections", 5)?
            .set_default("fleet.admin_tenant", "admin")?
            .set_default("fleet.legacy_tenant", "default")?
            .set_default("fleet.restore_on_boot", true)?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Environment-specific overrides (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("FLEET_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // FLEET_DATABASE__URL, FLEET_FLEET__ADMIN_TENANT, ...
            .add_source(
                Environment::with_prefix("FLEET")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.database.url.trim().is_empty() {
            errors.push("database.url must be set".to_string());
        }

        if self.database.max_connections == 0 {
            errors.push("database.max_connections must be positive".to_string());
        }

        if self.fleet.admin_tenant.trim().is_empty() {
            errors.push("fleet.admin_tenant must not be empty".to_string());
        }

        if self.fleet.legacy_tenant.trim().is_empty() {
            errors.push("fleet.legacy_tenant must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
