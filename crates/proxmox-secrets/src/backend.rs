//! Backend instance: storage plus the cached Proxmox connection handle.
//!
//! Each mounted backend owns exactly one [`ClientCache`]. The cache holds at
//! most one [`ProxmoxClient`] and rebuilds it from the stored connection
//! profile on the first `get_client` after an invalidation.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::AppResult;
use crate::models::ProxmoxConfig;
use crate::proxmox::ProxmoxClient;
use crate::storage::{get_json, Storage};

/// Storage key of the connection profile.
pub const CONFIG_STORAGE_PATH: &str = "config";

/// Storage prefix of roles.
pub const ROLE_STORAGE_PREFIX: &str = "role/";

/// Read the connection profile, `None` when it was never written.
pub async fn get_config(storage: &dyn Storage) -> AppResult<Option<ProxmoxConfig>> {
    get_json(storage, CONFIG_STORAGE_PATH).await
}

/// Memoized connection handle, guarded by a read/write lock.
#[derive(Debug, Default)]
pub struct ClientCache {
    slot: RwLock<Option<Arc<ProxmoxClient>>>,
}

impl ClientCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached client, building it from the stored profile if the
    /// cache is empty.
    ///
    /// The fast path only takes the shared lock. On a miss the exclusive
    /// lock is taken and the slot re-checked, so concurrent callers racing
    /// on an empty cache trigger a single build.
    pub async fn get_or_build(&self, storage: &dyn Storage) -> AppResult<Arc<ProxmoxClient>> {
        {
            let slot = self.slot.read().await;
            if let Some(client) = slot.as_ref() {
                return Ok(Arc::clone(client));
            }
        }

        let mut slot = self.slot.write().await;
        if let Some(client) = slot.as_ref() {
            return Ok(Arc::clone(client));
        }

        let config = get_config(storage).await?.unwrap_or_default();
        let client = Arc::new(ProxmoxClient::new(&config)?);
        *slot = Some(Arc::clone(&client));

        tracing::info!(token = %client.admin_token_id(), "Proxmox client cached");

        Ok(client)
    }

    /// Drop the cached client.
    pub async fn invalidate(&self) {
        let mut slot = self.slot.write().await;
        if slot.take().is_some() {
            tracing::debug!("Proxmox client cache cleared");
        }
    }

    pub async fn is_cached(&self) -> bool {
        self.slot.read().await.is_some()
    }
}

/// One mounted instance of the broker.
#[derive(Clone)]
pub struct Backend {
    storage: Arc<dyn Storage>,
    client: Arc<ClientCache>,
}

impl Backend {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            client: Arc::new(ClientCache::new()),
        }
    }

    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    /// Connection handle for the current profile.
    pub async fn get_client(&self) -> AppResult<Arc<ProxmoxClient>> {
        self.client.get_or_build(self.storage.as_ref()).await
    }

    /// Unconditionally drop the cached connection handle.
    pub async fn reset(&self) {
        self.client.invalidate().await;
    }

    /// Storage change hook: a change to the profile key resets the client.
    pub async fn invalidate(&self, key: &str) {
        if key == CONFIG_STORAGE_PATH {
            self.reset().await;
        }
    }

    pub async fn has_cached_client(&self) -> bool {
        self.client.is_cached().await
    }
}
