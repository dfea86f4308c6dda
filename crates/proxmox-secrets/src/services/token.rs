//! Proxmox API token engine.
//!
//! Issues a fresh API token for a role's user, and revokes or renews it
//! on behalf of the lease manager.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use super::lease::SecretBackend;
use super::role::RoleService;
use crate::backend::Backend;
use crate::error::{AppError, AppResult};
use crate::models::{InternalData, RoleEntry, Secret, SecretResponse};
use crate::proxmox::{ApiTokenSpec, UserId};

/// Secret type of issued API tokens.
pub const SECRET_TYPE: &str = "proxmox_api_token";

/// Comment attached to every token created on Proxmox.
pub const TOKEN_COMMENT: &str = "Managed by proxmox-secrets";

/// Issued tokens share the privileges of their user.
pub const PRIVILEGE_SEPARATION: bool = false;

/// Generate a token id: a lower-case UUID whose digits are mapped onto
/// the letters `g` to `p`, so the id never contains a digit.
pub fn generate_token_id() -> String {
    Uuid::new_v4()
        .hyphenated()
        .to_string()
        .chars()
        .map(|c| match c.to_digit(10) {
            Some(d) => char::from(b'g' + d as u8),
            None => c,
        })
        .collect()
}

/// Token engine bound to one backend instance.
#[derive(Clone)]
pub struct TokenService {
    backend: Backend,
    roles: RoleService,
}

impl TokenService {
    pub fn new(backend: Backend, roles: RoleService) -> Self {
        Self { backend, roles }
    }

    /// Create a token for the user of `role_name`.
    ///
    /// # Errors
    ///
    /// * `AppError::NotFound` - the role does not exist
    /// * `AppError::Config` - no usable connection profile
    /// * `AppError::Upstream` - the user is unknown to Proxmox or token
    ///   creation failed
    pub async fn issue(&self, role_name: &str) -> AppResult<SecretResponse> {
        let role = self.roles.require(role_name).await?;
        let client = self.backend.get_client().await?;

        let token_id = generate_token_id();
        let expire = remote_expiry(role.ttl, Utc::now().timestamp())?;

        let user = UserId::new(&role.user, &role.realm);
        client.get_user(&user).await?;

        let spec = ApiTokenSpec {
            token_id: token_id.clone(),
            comment: TOKEN_COMMENT.to_string(),
            expire,
            privsep: PRIVILEGE_SEPARATION,
        };
        let secret_value = client.create_token(&user, &spec).await?.ok_or_else(|| {
            AppError::Upstream("error creating Proxmox API token: no secret returned".to_string())
        })?;

        tracing::info!(
            role = %role.name,
            token = %user.full_token_id(&token_id),
            expire,
            "Proxmox API token issued"
        );

        let mut data = serde_json::Map::new();
        data.insert("token_id".to_string(), json!(token_id));
        data.insert("token_id_full".to_string(), json!(user.full_token_id(&token_id)));
        data.insert("secret".to_string(), json!(secret_value));

        let mut internal = InternalData::new();
        internal.insert("token_id".to_string(), json!(token_id));
        internal.insert("role".to_string(), json!(role.name));

        let mut secret = Secret::new(SECRET_TYPE, internal);
        apply_role_durations(&mut secret, &role);

        Ok(SecretResponse { data, secret })
    }

    /// Delete the token recorded in `secret`.
    pub async fn revoke_token(&self, secret: &Secret) -> AppResult<()> {
        let client = self.backend.get_client().await?;

        let token_id = secret
            .internal_str("token_id")
            .map_err(AppError::Internal)?
            .ok_or_else(|| AppError::Internal("secret is missing token_id internal data".to_string()))?;
        let role = self.role_of(secret).await?;

        let user = UserId::new(&role.user, &role.realm);
        client.delete_token(&user, token_id).await?;

        tracing::info!(
            role = %role.name,
            token = %user.full_token_id(token_id),
            "Proxmox API token revoked"
        );
        Ok(())
    }

    /// Re-apply the current durations of the secret's role. A role
    /// duration of 0 leaves the lease's value untouched.
    pub async fn renew_token(&self, secret: &Secret) -> AppResult<Secret> {
        let role = self.role_of(secret).await?;

        let mut renewed = secret.clone();
        apply_role_durations(&mut renewed, &role);
        Ok(renewed)
    }

    async fn role_of(&self, secret: &Secret) -> AppResult<RoleEntry> {
        let name = secret
            .internal_str("role")
            .map_err(AppError::Internal)?
            .ok_or_else(|| AppError::Internal("secret is missing role internal data".to_string()))?;
        self.roles.require(name).await
    }
}

/// Absolute unix expiry of a token issued at `now` for `ttl` seconds,
/// 0 when the token should not expire on the remote side.
fn remote_expiry(ttl: u64, now: i64) -> AppResult<i64> {
    if ttl == 0 {
        return Ok(0);
    }
    i64::try_from(ttl)
        .ok()
        .and_then(|ttl| now.checked_add(ttl))
        .ok_or_else(|| AppError::Validation(format!("role ttl {} is out of range", ttl)))
}

fn apply_role_durations(secret: &mut Secret, role: &RoleEntry) {
    if role.ttl > 0 {
        secret.ttl = role.ttl;
    }
    if role.max_ttl > 0 {
        secret.max_ttl = role.max_ttl;
    }
}

#[async_trait]
impl SecretBackend for TokenService {
    fn secret_type(&self) -> &'static str {
        SECRET_TYPE
    }

    fn sensitive_fields(&self) -> &'static [&'static str] {
        &["token_id", "secret"]
    }

    async fn revoke(&self, secret: &Secret) -> AppResult<()> {
        self.revoke_token(secret).await
    }

    async fn renew(&self, secret: &Secret) -> AppResult<Secret> {
        self.renew_token(secret).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CONFIG_STORAGE_PATH;
    use crate::models::{ProxmoxConfig, RoleWriteRequest};
    use crate::storage::{put_json, InmemStorage};
    use std::sync::Arc;
    use wiremock::matchers::{method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn engine(url: &str) -> TokenService {
        let storage = InmemStorage::new();
        let profile = ProxmoxConfig {
            user: "root".to_string(),
            realm: "pam".to_string(),
            token_id: "tok1".to_string(),
            token_secret: "s".to_string(),
            proxmox_url: url.to_string(),
            timeout: 5,
            ..ProxmoxConfig::default()
        };
        put_json(&storage, CONFIG_STORAGE_PATH, &profile)
            .await
            .unwrap();

        let backend = Backend::new(Arc::new(storage));
        let roles = RoleService::new(backend.clone());
        roles
            .write(
                "alice",
                RoleWriteRequest {
                    user: Some("alice".to_string()),
                    realm: Some("pve".to_string()),
                    ttl: Some(300),
                    max_ttl: None,
                },
            )
            .await
            .unwrap();

        TokenService::new(backend, roles)
    }

    async fn mount_user(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/access/users/alice@pve"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"data": {"enable": 1}})),
            )
            .mount(server)
            .await;
    }

    #[test]
    fn test_generated_token_id_has_no_digits() {
        for _ in 0..64 {
            let id = generate_token_id();
            assert_eq!(id.len(), 36);
            assert!(id.chars().all(|c| c == '-' || ('a'..='p').contains(&c)));
            assert!(id.chars().next().unwrap().is_ascii_alphabetic());
        }
        assert_ne!(generate_token_id(), generate_token_id());
    }

    #[test]
    fn test_remote_expiry() {
        assert_eq!(remote_expiry(0, 1_700_000_000).unwrap(), 0);
        assert_eq!(remote_expiry(300, 1_700_000_000).unwrap(), 1_700_000_300);
        assert!(matches!(
            remote_expiry(i64::MAX as u64, 1_700_000_000).unwrap_err(),
            AppError::Validation(_)
        ));
        assert!(matches!(
            remote_expiry(u64::MAX, 1_700_000_000).unwrap_err(),
            AppError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn test_issue_returns_token_and_lease_data() {
        let server = MockServer::start().await;
        mount_user(&server).await;
        Mock::given(method("POST"))
            .and(path_regex(r"^/access/users/alice@pve/token/[a-p-]+$"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"data": {"value": "secret-1"}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let engine = engine(&server.uri()).await;
        let issued = engine.issue("alice").await.unwrap();

        let token_id = issued.data["token_id"].as_str().unwrap().to_string();
        assert_eq!(issued.data["token_id_full"], format!("alice@pve!{}", token_id));
        assert_eq!(issued.data["secret"], "secret-1");

        assert_eq!(issued.secret.secret_type, SECRET_TYPE);
        assert_eq!(issued.secret.internal_str("token_id"), Ok(Some(token_id.as_str())));
        assert_eq!(issued.secret.internal_str("role"), Ok(Some("alice")));
        assert_eq!(issued.secret.ttl, 300);
        assert_eq!(issued.secret.max_ttl, 0);
    }

    #[tokio::test]
    async fn test_issue_for_unknown_role_is_not_found() {
        let server = MockServer::start().await;
        let engine = engine(&server.uri()).await;

        assert!(matches!(
            engine.issue("ghost").await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_issue_without_secret_in_response_fails() {
        let server = MockServer::start().await;
        mount_user(&server).await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": null})))
            .mount(&server)
            .await;

        let engine = engine(&server.uri()).await;
        assert!(matches!(
            engine.issue("alice").await.unwrap_err(),
            AppError::Upstream(_)
        ));
    }

    #[tokio::test]
    async fn test_issue_for_missing_remote_user_creates_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("no such user"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let engine = engine(&server.uri()).await;
        assert!(matches!(
            engine.issue("alice").await.unwrap_err(),
            AppError::Upstream(_)
        ));
    }

    #[tokio::test]
    async fn test_revoke_deletes_token_of_role_user() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/access/users/alice@pve/token/abc-def"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": null})))
            .expect(1)
            .mount(&server)
            .await;

        let engine = engine(&server.uri()).await;
        let mut internal = InternalData::new();
        internal.insert("token_id".to_string(), json!("abc-def"));
        internal.insert("role".to_string(), json!("alice"));

        engine
            .revoke(&Secret::new(SECRET_TYPE, internal))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_revoke_after_role_deleted_is_not_found() {
        let server = MockServer::start().await;
        let engine = engine(&server.uri()).await;
        engine.roles.delete("alice").await.unwrap();

        let mut internal = InternalData::new();
        internal.insert("token_id".to_string(), json!("abc-def"));
        internal.insert("role".to_string(), json!("alice"));

        assert!(matches!(
            engine.revoke(&Secret::new(SECRET_TYPE, internal)).await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_revoke_with_malformed_internal_data() {
        let server = MockServer::start().await;
        let engine = engine(&server.uri()).await;

        let mut internal = InternalData::new();
        internal.insert("role".to_string(), json!("alice"));
        assert!(matches!(
            engine.revoke(&Secret::new(SECRET_TYPE, internal.clone())).await.unwrap_err(),
            AppError::Internal(_)
        ));

        internal.insert("token_id".to_string(), json!(7));
        assert!(matches!(
            engine.revoke(&Secret::new(SECRET_TYPE, internal)).await.unwrap_err(),
            AppError::Internal(_)
        ));
    }

    #[tokio::test]
    async fn test_renew_uses_current_role_durations() {
        let server = MockServer::start().await;
        let engine = engine(&server.uri()).await;

        let mut internal = InternalData::new();
        internal.insert("token_id".to_string(), json!("abc-def"));
        internal.insert("role".to_string(), json!("alice"));
        let mut secret = Secret::new(SECRET_TYPE, internal);
        secret.ttl = 300;

        engine
            .roles
            .update(
                "alice",
                RoleWriteRequest {
                    ttl: Some(900),
                    max_ttl: Some(1800),
                    ..RoleWriteRequest::default()
                },
            )
            .await
            .unwrap();

        let renewed = engine.renew(&secret).await.unwrap();
        assert_eq!(renewed.ttl, 900);
        assert_eq!(renewed.max_ttl, 1800);
        assert_eq!(renewed.internal_data, secret.internal_data);
    }

    #[tokio::test]
    async fn test_renew_keeps_lease_durations_when_role_clears_them() {
        let server = MockServer::start().await;
        let engine = engine(&server.uri()).await;

        let mut internal = InternalData::new();
        internal.insert("token_id".to_string(), json!("abc-def"));
        internal.insert("role".to_string(), json!("alice"));
        let mut secret = Secret::new(SECRET_TYPE, internal);
        secret.ttl = 300;
        secret.max_ttl = 600;

        engine
            .roles
            .update(
                "alice",
                RoleWriteRequest {
                    ttl: Some(0),
                    ..RoleWriteRequest::default()
                },
            )
            .await
            .unwrap();

        let renewed = engine.renew(&secret).await.unwrap();
        assert_eq!(renewed.ttl, 300);
        assert_eq!(renewed.max_ttl, 600);
    }
}
