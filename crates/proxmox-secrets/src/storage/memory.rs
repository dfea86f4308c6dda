//! In-process storage used by default and in tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{relative_keys, Storage};
use crate::error::AppResult;

/// Storage backed by an ordered in-memory map.
#[derive(Debug, Clone, Default)]
pub struct InmemStorage {
    entries: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl InmemStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl Storage for InmemStorage {
    async fn get(&self, key: &str) -> AppResult<Option<Vec<u8>>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> AppResult<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> AppResult<Vec<String>> {
        let entries = self.entries.read().await;
        Ok(relative_keys(prefix, entries.keys().map(String::as_str)))
    }
}
