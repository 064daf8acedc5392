use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::{debug, info, instrument};

use super::records::{ExchangeConfig, ProviderConfig, Secret, WorkerDefinition};
use super::ConfigStore;
use crate::error::{FleetError, Result};

const WORKER_COLUMNS: &str = r#"
    id, user_id, name, ai_model_id, exchange_id,
    COALESCE(initial_balance, 1000.0)::NUMERIC AS initial_balance,
    COALESCE(scan_interval_minutes, 3) AS scan_interval_minutes,
    COALESCE(is_running, FALSE) AS is_running,
    COALESCE(custom_prompt, '') AS custom_prompt,
    COALESCE(override_base_prompt, FALSE) AS override_base_prompt,
    COALESCE(is_cross_margin, TRUE) AS is_cross_margin
"#;

/// PostgreSQL-backed config store
#[derive(Clone)]
pub struct PostgresConfigStore {
    pool: PgPool,
}

impl PostgresConfigStore {
    /// Create a new PostgreSQL store
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        info!("Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Create a store from an existing connection pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn worker_from_row(row: &PgRow) -> Result<WorkerDefinition> {
        Ok(WorkerDefinition {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            tenant_id: row.try_get("user_id")?,
            provider_id: row.try_get("ai_model_id")?,
            exchange_id: row.try_get("exchange_id")?,
            initial_balance: row.try_get::<Decimal, _>("initial_balance")?,
            scan_interval_minutes: row.try_get::<i32, _>("scan_interval_minutes")? as i64,
            run_flag: row.try_get("is_running")?,
            custom_prompt: row.try_get("custom_prompt")?,
            override_base_prompt: row.try_get("override_base_prompt")?,
            cross_margin: row.try_get("is_cross_margin")?,
        })
    }
}

#[async_trait]
impl ConfigStore for PostgresConfigStore {
    #[instrument(skip(self))]
    async fn worker_definitions(&self, tenant_id: &str) -> Result<Vec<WorkerDefinition>> {
        let sql = format!(
            "SELECT {WORKER_COLUMNS} FROM traders WHERE user_id = $1 ORDER BY created_at DESC"
        );
        let rows = sqlx::query(&sql).bind(tenant_id).fetch_all(&self.pool).await?;

        debug!("Fetched {} worker definitions for {}", rows.len(), tenant_id);
        rows.iter().map(Self::worker_from_row).collect()
    }

    #[instrument(skip(self))]
    async fn all_worker_definitions(&self) -> Result<Vec<WorkerDefinition>> {
        let sql = format!("SELECT {WORKER_COLUMNS} FROM traders ORDER BY created_at DESC");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        debug!("Fetched {} worker definitions (all tenants)", rows.len());
        rows.iter().map(Self::worker_from_row).collect()
    }

    async fn provider_configs(&self, tenant_id: &str) -> Result<Vec<ProviderConfig>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, name, provider,
                   COALESCE(enabled, FALSE) AS enabled,
                   COALESCE(api_key, '') AS api_key
            FROM ai_models WHERE user_id = $1 ORDER BY id
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| ProviderConfig {
                id: r.get("id"),
                tenant_id: r.get("user_id"),
                name: r.get("name"),
                kind: r.get("provider"),
                enabled: r.get("enabled"),
                api_key: Secret::new(r.get::<String, _>("api_key")),
            })
            .collect())
    }

    async fn exchange_configs(&self, tenant_id: &str) -> Result<Vec<ExchangeConfig>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, name, exchange_type,
                   COALESCE(enabled, FALSE) AS enabled,
                   COALESCE(api_key, '') AS api_key,
                   COALESCE(secret_key, '') AS secret_key,
                   COALESCE(testnet, FALSE) AS testnet,
                   COALESCE(hyperliquid_wallet_addr, '') AS hyperliquid_wallet_addr,
                   COALESCE(aster_user, '') AS aster_user,
                   COALESCE(aster_signer, '') AS aster_signer,
                   COALESCE(aster_private_key, '') AS aster_private_key
            FROM exchanges WHERE user_id = $1 ORDER BY id
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| ExchangeConfig {
                id: r.get("id"),
                tenant_id: r.get("user_id"),
                name: r.get("name"),
                kind: r.get("exchange_type"),
                enabled: r.get("enabled"),
                api_key: Secret::new(r.get::<String, _>("api_key")),
                secret_key: Secret::new(r.get::<String, _>("secret_key")),
                testnet: r.get("testnet"),
                wallet_address: r.get("hyperliquid_wallet_addr"),
                aster_user: r.get("aster_user"),
                aster_signer: r.get("aster_signer"),
                aster_private_key: Secret::new(r.get::<String, _>("aster_private_key")),
            })
            .collect())
    }

    async fn system_setting(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM system_config WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get("value")))
    }

    #[instrument(skip(self))]
    async fn set_worker_run_flag(
        &self,
        tenant_id: &str,
        worker_id: &str,
        running: bool,
    ) -> Result<()> {
        let result = sqlx::query("UPDATE traders SET is_running = $1 WHERE id = $2 AND user_id = $3")
            .bind(running)
            .bind(worker_id)
            .bind(tenant_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(FleetError::WorkerNotFound(worker_id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_url() -> String {
        std::env::var("FLEET_TEST_DATABASE_URL")
            .unwrap_or_else(|_| "postgresql://localhost/fleet_test".to_string())
    }

    #[tokio::test]
    #[ignore] // Requires database
    async fn test_undecodable_row_is_an_error() {
        // one connection so the temp table shadows any real `traders`
        let store = PostgresConfigStore::new(&test_url(), 1).await.unwrap();
        sqlx::query(
            r#"
            CREATE TEMP TABLE traders (
                id TEXT, user_id TEXT, name TEXT, ai_model_id TEXT, exchange_id TEXT,
                initial_balance NUMERIC, scan_interval_minutes INTEGER, is_running BOOLEAN,
                custom_prompt TEXT, override_base_prompt BOOLEAN, is_cross_margin BOOLEAN,
                created_at TIMESTAMPTZ DEFAULT NOW()
            )
            "#,
        )
        .execute(store.pool())
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO traders (id, user_id, name, ai_model_id, exchange_id) \
             VALUES ('alice_w1', 'alice', NULL, 'p1', 'e1')",
        )
        .execute(store.pool())
        .await
        .unwrap();

        let err = store.worker_definitions("alice").await.unwrap_err();
        assert!(matches!(err, FleetError::Database(_)));
    }

    #[tokio::test]
    #[ignore] // Requires database
    async fn test_defaults_fill_missing_columns() {
        let store = PostgresConfigStore::new(&test_url(), 1).await.unwrap();
        sqlx::query(
            r#"
            CREATE TEMP TABLE traders (
                id TEXT, user_id TEXT, name TEXT, ai_model_id TEXT, exchange_id TEXT,
                initial_balance NUMERIC, scan_interval_minutes INTEGER, is_running BOOLEAN,
                custom_prompt TEXT, override_base_prompt BOOLEAN, is_cross_margin BOOLEAN,
                created_at TIMESTAMPTZ DEFAULT NOW()
            )
            "#,
        )
        .execute(store.pool())
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO traders (id, user_id, name, ai_model_id, exchange_id) \
             VALUES ('alice_w1', 'alice', 'w1', 'p1', 'e1')",
        )
        .execute(store.pool())
        .await
        .unwrap();

        let defs = store.worker_definitions("alice").await.unwrap();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].initial_balance, Decimal::from(1000));
        assert_eq!(defs[0].scan_interval_minutes, 3);
        assert!(defs[0].cross_margin);
    }
}
