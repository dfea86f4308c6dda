//! Proxmox API HTTP client.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use std::time::Duration;

use super::types::{ApiResponse, ApiTokenSpec, CreateTokenBody, CreatedToken, UserId};
use crate::error::{AppError, AppResult};
use crate::models::ProxmoxConfig;

/// Connection handle bound to one connection profile.
#[derive(Debug, Clone)]
pub struct ProxmoxClient {
    client: reqwest::Client,
    base_url: reqwest::Url,
    admin_token_id: String,
}

impl ProxmoxClient {
    /// Build a client from a connection profile.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` when the admin token id is empty, the URL,
    /// proxy or headers are malformed, or the HTTP client cannot be built.
    pub fn new(config: &ProxmoxConfig) -> AppResult<Self> {
        if config.token_id.is_empty() {
            return Err(AppError::Config(
                "client api token was not defined".to_string(),
            ));
        }

        let admin_token_id = config.full_token_id();

        let base_url = reqwest::Url::parse(&config.proxmox_url).map_err(|e| {
            AppError::Config(format!("invalid proxmox_url '{}': {}", config.proxmox_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::Config(format!(
                "invalid proxmox_url '{}': not a base URL",
                config.proxmox_url
            )));
        }

        let mut headers = HeaderMap::new();
        for (name, value) in parse_http_headers(&config.http_headers)? {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| AppError::Config(format!("invalid header name '{}': {}", name, e)))?;
            let value = HeaderValue::from_str(&value)
                .map_err(|e| AppError::Config(format!("invalid header value: {}", e)))?;
            headers.insert(name, value);
        }

        let mut authorization = HeaderValue::from_str(&format!(
            "PVEAPIToken={}={}",
            admin_token_id, config.token_secret
        ))
        .map_err(|e| AppError::Config(format!("invalid api token: {}", e)))?;
        authorization.set_sensitive(true);
        headers.insert(AUTHORIZATION, authorization);

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .danger_accept_invalid_certs(config.insecure_skip_tls_verify);

        if config.timeout > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout));
        }

        if !config.proxy_server.is_empty() {
            let proxy = reqwest::Proxy::all(&config.proxy_server).map_err(|e| {
                AppError::Config(format!("invalid proxy_server '{}': {}", config.proxy_server, e))
            })?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| AppError::Config(format!("failed to build http client: {}", e)))?;

        tracing::debug!(
            url = %config.proxmox_url,
            token = %admin_token_id,
            insecure = config.insecure_skip_tls_verify,
            "Built Proxmox client"
        );

        Ok(Self {
            client,
            base_url,
            admin_token_id,
        })
    }

    /// The admin token the client authenticates with, `user@realm!token_id`.
    pub fn admin_token_id(&self) -> &str {
        &self.admin_token_id
    }

    /// API URL for `segments` below the base URL. Each segment is
    /// percent-encoded, so a `/` or `?` inside one stays part of it.
    fn endpoint(&self, segments: &[&str]) -> reqwest::Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Fetch a user, failing if it does not exist.
    pub async fn get_user(&self, user: &UserId) -> AppResult<serde_json::Value> {
        let response = self
            .client
            .get(self.endpoint(&["access", "users", user.to_string().as_str()]))
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("error when setting up API user: {}", e)))?;

        let response = ensure_success(response, "error when setting up API user").await?;
        let body: ApiResponse<serde_json::Value> = response.json().await?;

        body.data
            .ok_or_else(|| AppError::Upstream(format!("user '{}' returned no data", user)))
    }

    /// Create an API token for `user`. Returns the token secret, or `None`
    /// when the API answered without one.
    pub async fn create_token(
        &self,
        user: &UserId,
        spec: &ApiTokenSpec,
    ) -> AppResult<Option<String>> {
        let response = self
            .client
            .post(self.endpoint(&[
                "access",
                "users",
                user.to_string().as_str(),
                "token",
                spec.token_id.as_str(),
            ]))
            .json(&CreateTokenBody::from(spec))
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("error from API when creating token: {}", e)))?;

        let response = ensure_success(response, "error from API when creating token").await?;
        let body: ApiResponse<CreatedToken> = response.json().await?;

        Ok(body.data.and_then(|created| {
            tracing::debug!(
                token = created.full_tokenid.as_deref().unwrap_or_default(),
                "Proxmox API token created"
            );
            created.value
        }))
    }

    /// Delete an API token of `user`.
    pub async fn delete_token(&self, user: &UserId, token_id: &str) -> AppResult<()> {
        let response = self
            .client
            .delete(self.endpoint(&[
                "access",
                "users",
                user.to_string().as_str(),
                "token",
                token_id,
            ]))
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("error from API when deleting token: {}", e)))?;

        ensure_success(response, "error from API when deleting token").await?;
        Ok(())
    }
}

async fn ensure_success(response: reqwest::Response, context: &str) -> AppResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(AppError::Upstream(format!(
        "{}: status {}: {}",
        context,
        status,
        body.trim()
    )))
}

/// Split `Key,Value,Key1,Value1` into header pairs.
pub fn parse_http_headers(raw: &str) -> AppResult<Vec<(String, String)>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }

    let items: Vec<&str> = raw.split(',').map(str::trim).collect();
    if items.len() % 2 != 0 {
        return Err(AppError::Config(
            "http_headers must be a list of Key,Value pairs".to_string(),
        ));
    }

    Ok(items
        .chunks(2)
        .map(|pair| (pair[0].to_string(), pair[1].to_string()))
        .collect())
}
