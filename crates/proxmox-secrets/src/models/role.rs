//! Role model.
//!
//! A role maps a name to the Proxmox identity whose tokens it mints, plus
//! the lease durations applied to those tokens.

use serde::{Deserialize, Serialize};

use super::duration::deserialize_opt_seconds;

/// Persisted role, stored under `role/<name>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleEntry {
    pub name: String,

    /// Proxmox user this role impersonates
    pub user: String,

    /// Realm of that user, e.g. `pve`
    pub realm: String,

    /// Default lease in seconds, 0 means the lease manager default
    #[serde(default)]
    pub ttl: u64,

    /// Maximum lease in seconds, 0 means the lease manager default
    #[serde(default)]
    pub max_ttl: u64,
}

/// Request body for writing a role.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleWriteRequest {
    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub realm: Option<String>,

    #[serde(default, deserialize_with = "deserialize_opt_seconds")]
    pub ttl: Option<u64>,

    #[serde(default, deserialize_with = "deserialize_opt_seconds")]
    pub max_ttl: Option<u64>,
}
