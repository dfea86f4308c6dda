//! Proxmox API value types.

use serde::{Deserialize, Serialize};

/// A Proxmox user id, rendered `name@realm`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId {
    pub name: String,
    pub realm: String,
}

impl UserId {
    pub fn new(name: impl Into<String>, realm: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            realm: realm.into(),
        }
    }

    /// Token id qualified with this user: `name@realm!token_id`.
    pub fn full_token_id(&self, token_id: &str) -> String {
        format!("{}!{}", self, token_id)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.name, self.realm)
    }
}

/// Parameters of a token to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiTokenSpec {
    pub token_id: String,
    pub comment: String,
    /// Absolute expiry as a unix timestamp, 0 for none
    pub expire: i64,
    /// Privilege separation
    pub privsep: bool,
}

/// Request body of `POST /access/users/{userid}/token/{tokenid}`.
#[derive(Debug, Serialize)]
pub(crate) struct CreateTokenBody<'a> {
    pub comment: &'a str,
    pub expire: i64,
    pub privsep: u8,
}

impl<'a> From<&'a ApiTokenSpec> for CreateTokenBody<'a> {
    fn from(spec: &'a ApiTokenSpec) -> Self {
        Self {
            comment: &spec.comment,
            expire: spec.expire,
            privsep: u8::from(spec.privsep),
        }
    }
}

/// Envelope of every Proxmox API response.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiResponse<T> {
    pub data: Option<T>,
}

/// `data` of a successful token creation.
#[derive(Debug, Deserialize)]
pub(crate) struct CreatedToken {
    #[serde(default)]
    pub value: Option<String>,
    #[serde(rename = "full-tokenid", default)]
    pub full_tokenid: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_display() {
        let user = UserId::new("root", "pam");
        assert_eq!(user.to_string(), "root@pam");
        assert_eq!(user.full_token_id("tok1"), "root@pam!tok1");
    }

    #[test]
    fn test_create_body_encodes_privsep_as_int() {
        let spec = ApiTokenSpec {
            token_id: "abc".to_string(),
            comment: "c".to_string(),
            expire: 0,
            privsep: false,
        };
        let body = serde_json::to_value(CreateTokenBody::from(&spec)).unwrap();
        assert_eq!(body, serde_json::json!({"comment": "c", "expire": 0, "privsep": 0}));
    }
}
