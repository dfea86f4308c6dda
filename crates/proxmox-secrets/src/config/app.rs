//! Application configuration for the broker server.

use serde::Deserialize;
use std::time::Duration;

/// Default and maximum lease duration: 768 hours.
const DEFAULT_LEASE_SECONDS: u64 = 768 * 60 * 60;

/// Which storage backend to persist records in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Process memory; records are lost on restart
    #[default]
    Memory,
    /// PostgreSQL, configured through `POSTGRES_*`
    Postgres,
}

/// Application configuration loaded from environment variables.
///
/// Environment variables are prefixed with `PROXMOX_SECRETS_`:
/// - `PROXMOX_SECRETS_HOST`: Server bind address (default: "0.0.0.0")
/// - `PROXMOX_SECRETS_PORT`: Server port (default: 8210)
/// - `PROXMOX_SECRETS_MOUNT`: Mount path of the API (default: "proxmox")
/// - `PROXMOX_SECRETS_DEFAULT_LEASE_TTL`: Lease TTL in seconds when a role sets none
/// - `PROXMOX_SECRETS_MAX_LEASE_TTL`: Upper bound for any lease in seconds
/// - `PROXMOX_SECRETS_LEASE_SWEEP_INTERVAL`: Expired-lease sweep period in seconds
/// - `PROXMOX_SECRETS_STORAGE`: `memory` or `postgres`
/// - `PROXMOX_SECRETS_SEAL_KEY`: Base64 AES-256 key sealing config and roles at rest
/// - `PROXMOX_SECRETS_LOG_JSON`: Emit JSON logs
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Mount path, routes live under `/v1/<mount>/`
    #[serde(default = "default_mount")]
    pub mount: String,

    /// Lease TTL applied when a role does not set one
    #[serde(default = "default_lease_ttl")]
    pub default_lease_ttl: u64,

    /// Hard upper bound for every lease
    #[serde(default = "default_lease_ttl")]
    pub max_lease_ttl: u64,

    /// Expired lease sweep interval in seconds
    #[serde(default = "default_sweep_interval")]
    pub lease_sweep_interval: u64,

    /// Storage backend
    #[serde(default)]
    pub storage: StorageKind,

    /// Seal key (optional)
    #[serde(default)]
    pub seal_key: Option<String>,

    /// JSON log output
    #[serde(default)]
    pub log_json: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8210
}

fn default_mount() -> String {
    "proxmox".to_string()
}

fn default_lease_ttl() -> u64 {
    DEFAULT_LEASE_SECONDS
}

fn default_sweep_interval() -> u64 {
    30
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::prefixed("PROXMOX_SECRETS_").from_env::<AppConfig>()
    }

    /// Get the server bind address as a string suitable for `TcpListener::bind`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Mount path without surrounding slashes.
    pub fn mount_path(&self) -> &str {
        self.mount.trim_matches('/')
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.lease_sweep_interval.max(1))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            mount: default_mount(),
            default_lease_ttl: default_lease_ttl(),
            max_lease_ttl: default_lease_ttl(),
            lease_sweep_interval: default_sweep_interval(),
            storage: StorageKind::Memory,
            seal_key: None,
            log_json: false,
        }
    }
}
