//! Key-value storage collaborator.
//!
//! The broker persists everything (connection profile, roles, leases) as
//! JSON records behind the [`Storage`] trait. Keys are `/`-separated paths;
//! listing is one level deep, with nested keys collapsed to `segment/`.

mod memory;
mod postgres;
mod sealed;

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::AppResult;

pub use memory::InmemStorage;
pub use postgres::PgStorage;
pub use sealed::SealedStorage;

/// Byte-oriented key-value store.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Fetch a value, `None` when the key is absent.
    async fn get(&self, key: &str) -> AppResult<Option<Vec<u8>>>;

    /// Replace the value stored under `key`.
    async fn put(&self, key: &str, value: Vec<u8>) -> AppResult<()>;

    /// Remove `key`. Deleting an absent key succeeds.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// List keys directly under `prefix`, relative to it, sorted ascending.
    async fn list(&self, prefix: &str) -> AppResult<Vec<String>>;

    /// Check the store is reachable.
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

/// Decode the JSON record stored under `key`.
pub async fn get_json<T: DeserializeOwned>(
    storage: &dyn Storage,
    key: &str,
) -> AppResult<Option<T>> {
    match storage.get(key).await? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

/// Encode `value` as JSON and store it under `key` in a single put.
pub async fn put_json<T: Serialize>(storage: &dyn Storage, key: &str, value: &T) -> AppResult<()> {
    let bytes = serde_json::to_vec(value)?;
    storage.put(key, bytes).await
}

/// Collapse absolute keys into the one-level listing of `prefix`.
pub(crate) fn relative_keys<'a, I>(prefix: &str, keys: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let listed: BTreeSet<String> = keys
        .into_iter()
        .filter_map(|key| key.strip_prefix(prefix))
        .filter(|rest| !rest.is_empty())
        .map(|rest| match rest.find('/') {
            Some(idx) => rest[..=idx].to_string(),
            None => rest.to_string(),
        })
        .collect();

    listed.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_keys_one_level() {
        let keys = [
            "config",
            "role/bob",
            "role/alice",
            "role/nested/deep",
            "role/nested/other",
            "sys/lease/1",
        ];

        assert_eq!(
            relative_keys("role/", keys.iter().copied()),
            vec!["alice", "bob", "nested/"]
        );
        assert_eq!(relative_keys("", keys.iter().copied()), vec!["config", "role/", "sys/"]);
        assert!(relative_keys("missing/", keys.iter().copied()).is_empty());
    }
}
