//! PostgreSQL-backed storage.

use async_trait::async_trait;

use super::{relative_keys, Storage};
use crate::db::pool::health_check;
use crate::db::queries::entry as queries;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};

/// Storage persisting records in `<schema>.kv_entry`.
#[derive(Clone)]
pub struct PgStorage {
    pool: DbPool,
    schema: String,
}

impl PgStorage {
    /// Wrap a pool and make sure the entry table exists.
    pub async fn connect(pool: DbPool, schema: &str) -> AppResult<Self> {
        queries::ensure_schema(&pool, schema).await?;
        tracing::info!(schema = %schema, "PostgreSQL storage ready");
        Ok(Self {
            pool,
            schema: schema.to_string(),
        })
    }
}

#[async_trait]
impl Storage for PgStorage {
    async fn get(&self, key: &str) -> AppResult<Option<Vec<u8>>> {
        queries::get_entry(&self.pool, &self.schema, key).await
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> AppResult<()> {
        queries::upsert_entry(&self.pool, &self.schema, key, &value).await
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        queries::delete_entry(&self.pool, &self.schema, key).await?;
        Ok(())
    }

    async fn list(&self, prefix: &str) -> AppResult<Vec<String>> {
        let keys = queries::list_keys_with_prefix(&self.pool, &self.schema, prefix).await?;
        Ok(relative_keys(prefix, keys.iter().map(String::as_str)))
    }

    async fn ping(&self) -> AppResult<()> {
        if health_check(&self.pool).await {
            Ok(())
        } else {
            Err(AppError::Storage("database is unreachable".to_string()))
        }
    }
}
