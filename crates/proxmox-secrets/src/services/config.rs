//! Connection profile service.
//!
//! Owns the `config` record. Every successful write or delete resets the
//! backend's cached Proxmox client.

use crate::backend::{get_config, Backend, CONFIG_STORAGE_PATH};
use crate::error::{AppError, AppResult};
use crate::models::{ConfigResponse, ConfigWriteRequest, ProxmoxConfig};
use crate::storage::put_json;

/// Default per-request timeout in seconds applied on creation.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 120;

/// Service for connection profile operations.
#[derive(Clone)]
pub struct ConfigService {
    backend: Backend,
}

impl ConfigService {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    /// Whether a profile is stored.
    pub async fn exists(&self) -> AppResult<bool> {
        Ok(self.backend.storage().get(CONFIG_STORAGE_PATH).await?.is_some())
    }

    /// Read the profile without its secret.
    ///
    /// When no profile is stored an all-defaults profile is returned.
    pub async fn read(&self) -> AppResult<ConfigResponse> {
        let config = get_config(self.backend.storage()).await?.unwrap_or_default();
        Ok(ConfigResponse::from(&config))
    }

    /// Create the profile, or update it when one is already stored.
    pub async fn write(&self, request: ConfigWriteRequest) -> AppResult<()> {
        let create = !self.exists().await?;
        self.apply(request, create).await
    }

    /// Update the stored profile.
    ///
    /// # Errors
    ///
    /// `AppError::NotFound` when no profile is stored.
    pub async fn update(&self, request: ConfigWriteRequest) -> AppResult<()> {
        self.apply(request, false).await
    }

    /// Delete the profile.
    pub async fn delete(&self) -> AppResult<()> {
        self.backend.storage().delete(CONFIG_STORAGE_PATH).await?;
        self.backend.invalidate(CONFIG_STORAGE_PATH).await;
        tracing::info!("Connection profile deleted");
        Ok(())
    }

    async fn apply(&self, request: ConfigWriteRequest, create: bool) -> AppResult<()> {
        let existing = get_config(self.backend.storage()).await?;

        let config = match existing {
            Some(config) if !create => merge(config, request, false)?,
            None if !create => {
                return Err(AppError::NotFound(
                    "config not found during update operation".to_string(),
                ))
            }
            _ => merge(ProxmoxConfig::default(), request, true)?,
        };

        put_json(self.backend.storage(), CONFIG_STORAGE_PATH, &config).await?;
        self.backend.invalidate(CONFIG_STORAGE_PATH).await;

        tracing::info!(
            user = %config.user,
            realm = %config.realm,
            url = %config.proxmox_url,
            create,
            "Connection profile written"
        );

        Ok(())
    }
}

/// Merge supplied fields into `config`.
///
/// On creation the five connection fields are required and the optional
/// ones fall back to their defaults. Empty strings count as not supplied.
fn merge(
    mut config: ProxmoxConfig,
    request: ConfigWriteRequest,
    create: bool,
) -> AppResult<ProxmoxConfig> {
    let required = [
        ("user", request.user, &mut config.user),
        ("realm", request.realm, &mut config.realm),
        ("token_id", request.token_id, &mut config.token_id),
        ("token_secret", request.token_secret, &mut config.token_secret),
        ("proxmox_url", request.proxmox_url, &mut config.proxmox_url),
    ];

    for (field, supplied, slot) in required {
        match supplied.filter(|v| !v.is_empty()) {
            Some(value) => *slot = value,
            None if create => {
                return Err(AppError::Validation(format!(
                    "missing {} in configuration",
                    field
                )))
            }
            None => {}
        }
    }

    if let Some(skip) = request.insecure_skip_tls_verify {
        config.insecure_skip_tls_verify = skip;
    } else if create {
        config.insecure_skip_tls_verify = false;
    }

    if let Some(headers) = request.http_headers {
        config.http_headers = headers;
    } else if create {
        config.http_headers = String::new();
    }

    if let Some(proxy) = request.proxy_server {
        config.proxy_server = proxy;
    } else if create {
        config.proxy_server = String::new();
    }

    if let Some(timeout) = request.timeout {
        config.timeout = timeout;
    } else if create {
        config.timeout = DEFAULT_TIMEOUT_SECONDS;
    }

    Ok(config)
}
