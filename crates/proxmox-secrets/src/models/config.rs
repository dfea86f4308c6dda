//! Connection profile model.
//!
//! The profile is a singleton record stored under `config`. The admin
//! token secret is write-only: [`ConfigResponse`] has no field for it.

use serde::{Deserialize, Serialize};

/// Persisted connection profile for the Proxmox API.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxmoxConfig {
    /// User that the admin API token belongs to, e.g. `root`
    #[serde(default)]
    pub user: String,

    /// Realm of that user, e.g. `pam`
    #[serde(default)]
    pub realm: String,

    /// API token id, excluding the `<user>@<realm>!` prefix
    #[serde(default)]
    pub token_id: String,

    /// API token secret
    #[serde(default)]
    pub token_secret: String,

    /// API endpoint, e.g. `https://host.fqdn:8006/api2/json`
    #[serde(default)]
    pub proxmox_url: String,

    /// Skip TLS certificate verification
    #[serde(default)]
    pub insecure_skip_tls_verify: bool,

    /// Custom headers as `Key,Value,Key1,Value1`
    #[serde(default)]
    pub http_headers: String,

    /// Proxy URL, e.g. `http://proxy:port`
    #[serde(default)]
    pub proxy_server: String,

    /// Per-request timeout in seconds
    #[serde(default)]
    pub timeout: u64,
}

impl ProxmoxConfig {
    /// Compound admin token id: `user@realm!token_id`.
    pub fn full_token_id(&self) -> String {
        format!("{}@{}!{}", self.user, self.realm, self.token_id)
    }
}

impl std::fmt::Debug for ProxmoxConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxmoxConfig")
            .field("user", &self.user)
            .field("realm", &self.realm)
            .field("token_id", &self.token_id)
            .field("token_secret", &"<redacted>")
            .field("proxmox_url", &self.proxmox_url)
            .field("insecure_skip_tls_verify", &self.insecure_skip_tls_verify)
            .field("http_headers", &self.http_headers)
            .field("proxy_server", &self.proxy_server)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Request body for writing the connection profile.
///
/// Absent fields are left unchanged on update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigWriteRequest {
    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub realm: Option<String>,

    #[serde(default)]
    pub token_id: Option<String>,

    #[serde(default)]
    pub token_secret: Option<String>,

    #[serde(default)]
    pub proxmox_url: Option<String>,

    #[serde(default)]
    pub insecure_skip_tls_verify: Option<bool>,

    #[serde(default)]
    pub http_headers: Option<String>,

    #[serde(default)]
    pub proxy_server: Option<String>,

    #[serde(default)]
    pub timeout: Option<u64>,
}

/// Connection profile as returned by reads. Never carries the secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigResponse {
    pub user: String,
    pub realm: String,
    pub token_id: String,
    pub proxmox_url: String,
    pub insecure_skip_tls_verify: bool,
    pub http_headers: String,
    pub proxy_server: String,
    pub timeout: u64,
}

impl From<&ProxmoxConfig> for ConfigResponse {
    fn from(config: &ProxmoxConfig) -> Self {
        Self {
            user: config.user.clone(),
            realm: config.realm.clone(),
            token_id: config.token_id.clone(),
            proxmox_url: config.proxmox_url.clone(),
            insecure_skip_tls_verify: config.insecure_skip_tls_verify,
            http_headers: config.http_headers.clone(),
            proxy_server: config.proxy_server.clone(),
            timeout: config.timeout,
        }
    }
}
