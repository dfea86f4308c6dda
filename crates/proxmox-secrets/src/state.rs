//! Application state for the broker server.
//!
//! This module wires one backend instance together: storage, the cached
//! Proxmox client, the services, and the lease manager with the token
//! engine registered as its secret type.

use std::sync::Arc;

use crate::backend::Backend;
use crate::config::AppConfig;
use crate::services::{ConfigService, LeaseDefaults, LeaseManager, RoleService, TokenService};
use crate::storage::Storage;

/// Shared application state.
///
/// Cloned into every handler through Axum's state.
#[derive(Clone)]
pub struct AppState {
    /// Backend instance holding storage and the client cache
    pub backend: Backend,

    pub config_service: ConfigService,

    pub roles: RoleService,

    pub tokens: TokenService,

    pub leases: Arc<LeaseManager>,

    /// Application configuration
    pub config: Arc<AppConfig>,

    /// Server start time for uptime calculation
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Build the state on top of `storage`.
    pub fn new(storage: Arc<dyn Storage>, config: AppConfig) -> Self {
        let backend = Backend::new(Arc::clone(&storage));
        let config_service = ConfigService::new(backend.clone());
        let roles = RoleService::new(backend.clone());
        let tokens = TokenService::new(backend.clone(), roles.clone());

        let mut leases = LeaseManager::new(
            storage,
            config.mount_path(),
            LeaseDefaults {
                default_ttl: config.default_lease_ttl,
                max_ttl: config.max_lease_ttl,
            },
        );
        leases.register_backend(Arc::new(tokens.clone()));

        Self {
            backend,
            config_service,
            roles,
            tokens,
            leases: Arc::new(leases),
            config: Arc::new(config),
            start_time: std::time::Instant::now(),
        }
    }

    /// Get the server uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
