//! Leased secret model.
//!
//! A [`Secret`] is what travels between the token engine and the lease
//! manager: the internal data needed to revoke or renew, and the lease
//! durations requested by the issuing role. Response data (the token
//! secret itself) is never part of it.

use serde::{Deserialize, Serialize};

/// Opaque per-lease data owned by the secret type.
pub type InternalData = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Secret {
    /// Registered secret type that handles revoke/renew
    pub secret_type: String,

    #[serde(default)]
    pub internal_data: InternalData,

    /// Requested lease in seconds, 0 defers to the lease manager default
    #[serde(default)]
    pub ttl: u64,

    /// Requested maximum lease in seconds, 0 defers to the lease manager
    #[serde(default)]
    pub max_ttl: u64,

    #[serde(default)]
    pub renewable: bool,
}

impl Secret {
    pub fn new(secret_type: impl Into<String>, internal_data: InternalData) -> Self {
        Self {
            secret_type: secret_type.into(),
            internal_data,
            ttl: 0,
            max_ttl: 0,
            renewable: true,
        }
    }

    /// String value from the internal data.
    ///
    /// `Ok(None)` when absent, an error message when present but not a string.
    pub fn internal_str(&self, key: &str) -> Result<Option<&str>, String> {
        match self.internal_data.get(key) {
            None => Ok(None),
            Some(serde_json::Value::String(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(format!("invalid value for {} in secret internal data", key)),
        }
    }
}

/// Freshly issued secret: caller-visible data plus the lease record.
#[derive(Debug, Clone, PartialEq)]
pub struct SecretResponse {
    pub data: serde_json::Map<String, serde_json::Value>,
    pub secret: Secret,
}
