//! Key-value entry queries.
//!
//! All records live in a single `<schema>.kv_entry` table. The schema name
//! is validated by [`crate::config::DatabaseConfig`] before it reaches
//! these statements.

use crate::db::DbPool;
use crate::error::AppResult;

/// Create the schema and the entry table if missing.
pub async fn ensure_schema(pool: &DbPool, schema: &str) -> AppResult<()> {
    sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {schema}"))
        .execute(pool)
        .await?;

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {schema}.kv_entry (
            key TEXT PRIMARY KEY,
            value BYTEA NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#
    ))
    .execute(pool)
    .await?;

    Ok(())
}

/// Get an entry value by key.
pub async fn get_entry(pool: &DbPool, schema: &str, key: &str) -> AppResult<Option<Vec<u8>>> {
    let row: Option<(Vec<u8>,)> = sqlx::query_as(&format!(
        "SELECT value FROM {schema}.kv_entry WHERE key = $1"
    ))
    .bind(key)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(value,)| value))
}

/// Insert or replace an entry.
pub async fn upsert_entry(pool: &DbPool, schema: &str, key: &str, value: &[u8]) -> AppResult<()> {
    sqlx::query(&format!(
        r#"
        INSERT INTO {schema}.kv_entry (key, value)
        VALUES ($1, $2)
        ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
        "#
    ))
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(())
}

/// Delete an entry. Returns whether a row was removed.
pub async fn delete_entry(pool: &DbPool, schema: &str, key: &str) -> AppResult<bool> {
    let result = sqlx::query(&format!("DELETE FROM {schema}.kv_entry WHERE key = $1"))
        .bind(key)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// List every key starting with `prefix`, ordered.
pub async fn list_keys_with_prefix(
    pool: &DbPool,
    schema: &str,
    prefix: &str,
) -> AppResult<Vec<String>> {
    let pattern = format!("{}%", escape_like(prefix));

    let rows: Vec<(String,)> = sqlx::query_as(&format!(
        r#"SELECT key FROM {schema}.kv_entry WHERE key LIKE $1 ESCAPE '\' ORDER BY key"#
    ))
    .bind(pattern)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|(key,)| key).collect())
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
