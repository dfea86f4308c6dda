//! Lease records and lease API payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::duration::deserialize_opt_seconds;
use super::secret::Secret;

/// Persisted lease, stored under `sys/lease/<uuid>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaseEntry {
    pub lease_id: String,

    /// Path the secret was issued from, e.g. `creds/alice`
    pub path: String,

    pub secret: Secret,

    pub issue_time: DateTime<Utc>,

    pub expire_time: DateTime<Utc>,

    #[serde(default)]
    pub last_renewal_time: Option<DateTime<Utc>>,

    /// Effective maximum lease in seconds, counted from `issue_time`
    pub max_ttl: u64,
}

impl LeaseEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expire_time <= now
    }

    /// Seconds left until expiry, 0 once expired.
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> u64 {
        (self.expire_time - now).num_seconds().max(0) as u64
    }
}

/// Response returned for a newly issued secret.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaseResponse {
    pub lease_id: String,
    pub lease_duration: u64,
    pub renewable: bool,
    pub data: serde_json::Map<String, serde_json::Value>,
}

/// Body for the renew, revoke and lookup endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LeaseRequest {
    pub lease_id: String,

    /// Requested extension in seconds, renew only
    #[serde(default, deserialize_with = "deserialize_opt_seconds")]
    pub increment: Option<u64>,
}

/// Lease metadata. Carries no secret data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaseLookupResponse {
    pub id: String,
    pub issue_time: DateTime<Utc>,
    pub expire_time: DateTime<Utc>,
    pub last_renewal: Option<DateTime<Utc>>,
    pub renewable: bool,
    pub ttl: u64,
}
