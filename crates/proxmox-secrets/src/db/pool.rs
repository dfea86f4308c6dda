//! Connection pool behind [`crate::storage::PgStorage`].
//!
//! One pool serves every `kv_entry` read and write, so lease sweeps and
//! API requests share the same connection budget.

use crate::config::DatabaseConfig;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

/// PostgreSQL pool shared by the storage queries.
pub type DbPool = PgPool;

/// Pool sizing taken from the `POSTGRES_` settings.
fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout))
}

/// Open the pool the storage backend runs on.
///
/// # Errors
///
/// Returns an error if the database cannot be reached.
pub async fn create_pool(config: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    let pool = pool_options(config)
        .connect_with(config.connect_options())
        .await?;

    tracing::info!(
        host = %config.host,
        port = %config.port,
        database = %config.database,
        schema = %config.schema,
        max_connections = config.max_connections,
        "Storage connection pool created"
    );

    Ok(pool)
}

/// Whether the storage database answers a trivial query.
pub async fn health_check(pool: &DbPool) -> bool {
    sqlx::query("SELECT 1").execute(pool).await.is_ok()
}
