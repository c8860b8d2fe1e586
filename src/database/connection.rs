use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::execution::target::TargetEntity;
use crate::database::session::PgSessionFactory;
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use tracing::{debug, info};

/// Pooled Postgres connection used to list keys and hand out worker sessions
#[derive(Debug, Clone)]
pub struct DatabaseConnection {
    pool: PgPool,
}

impl DatabaseConnection {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout())
            .connect(&config.url)
            .await?;

        info!(
            max_connections = config.max_connections,
            acquire_timeout_secs = config.acquire_timeout_seconds,
            "🔌 DATABASE: Pool initialized"
        );

        Ok(Self { pool })
    }

    /// Wrap an existing pool, e.g. one provided by `#[sqlx::test]`
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<bool> {
        let row = sqlx::query("SELECT 1 as health")
            .fetch_one(&self.pool)
            .await?;

        let health: i32 = row.try_get("health")?;
        Ok(health == 1)
    }

    /// Every key of the entity, ascending
    pub async fn load_keys(&self, entity: &TargetEntity) -> Result<Vec<i64>> {
        let statement = entity.key_listing_statement();
        debug!(statement = %statement, "Loading keys");

        let keys: Vec<i64> = sqlx::query_scalar(&statement)
            .fetch_all(&self.pool)
            .await?;

        info!(
            table = entity.table(),
            key_column = entity.key_column(),
            keys = keys.len(),
            "🔑 DATABASE: Keys loaded"
        );
        Ok(keys)
    }

    /// Factory giving each worker its own pooled connection
    pub fn session_factory(&self) -> PgSessionFactory {
        PgSessionFactory::new(self.pool.clone())
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}
