//! Encrypting wrapper for seal-wrapped paths.

use std::sync::Arc;

use async_trait::async_trait;

use super::Storage;
use crate::crypto::Encryptor;
use crate::error::AppResult;

/// Paths whose values are sealed at rest. A trailing `/` marks a prefix.
pub const SEAL_WRAP_PATHS: &[&str] = &["config", "role/"];

/// Storage that AES-GCM seals values written under [`SEAL_WRAP_PATHS`].
///
/// Keys and listings are passed through untouched.
#[derive(Clone)]
pub struct SealedStorage {
    inner: Arc<dyn Storage>,
    encryptor: Encryptor,
}

impl SealedStorage {
    pub fn new(inner: Arc<dyn Storage>, encryptor: Encryptor) -> Self {
        Self { inner, encryptor }
    }

    fn is_sealed(key: &str) -> bool {
        SEAL_WRAP_PATHS.iter().any(|path| {
            if path.ends_with('/') {
                key.starts_with(path)
            } else {
                key == *path
            }
        })
    }
}

#[async_trait]
impl Storage for SealedStorage {
    async fn get(&self, key: &str) -> AppResult<Option<Vec<u8>>> {
        match self.inner.get(key).await? {
            Some(value) if Self::is_sealed(key) => Ok(Some(self.encryptor.decrypt(&value)?)),
            other => Ok(other),
        }
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> AppResult<()> {
        let value = if Self::is_sealed(key) {
            self.encryptor.encrypt(&value)?
        } else {
            value
        };
        self.inner.put(key, value).await
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.inner.delete(key).await
    }

    async fn list(&self, prefix: &str) -> AppResult<Vec<String>> {
        self.inner.list(prefix).await
    }

    async fn ping(&self) -> AppResult<()> {
        self.inner.ping().await
    }
}
