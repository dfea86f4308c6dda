//! Shared helpers for the HTTP integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request as MockRequest, Respond, ResponseTemplate};

use proxmox_secrets::config::AppConfig;
use proxmox_secrets::error::{AppError, AppResult};
use proxmox_secrets::routes::build_router;
use proxmox_secrets::state::AppState;
use proxmox_secrets::storage::{InmemStorage, Storage};

/// Router over in-memory storage plus a handle on its state.
pub struct TestApp {
    pub state: AppState,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    pub fn with_config(config: AppConfig) -> Self {
        Self::with_storage(Arc::new(InmemStorage::new()), config)
    }

    pub fn with_storage(storage: Arc<dyn Storage>, config: AppConfig) -> Self {
        let state = AppState::new(storage, config);
        let router = build_router(state.clone());
        Self { state, router }
    }

    /// Send a request and return the status with the decoded body,
    /// `Value::Null` when the body is empty.
    pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .expect("build request"),
            None => builder.body(Body::empty()).expect("build request"),
        };

        let response = self.router.clone().oneshot(request).await.expect("request");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");

        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("parse json")
        };
        (status, value)
    }

    /// Store a connection profile pointing at `url`.
    pub async fn configure(&self, url: &str) {
        let (status, _) = self
            .send(
                Method::POST,
                "/v1/proxmox/config",
                Some(json!({
                    "user": "root",
                    "realm": "pam",
                    "token_id": "broker",
                    "token_secret": "admin-secret",
                    "proxmox_url": url,
                    "timeout": 5
                })),
            )
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    pub async fn write_role(&self, name: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, &format!("/v1/proxmox/role/{}", name), Some(body))
            .await
    }

    pub async fn issue(&self, role: &str) -> (StatusCode, Value) {
        self.send(Method::POST, &format!("/v1/proxmox/creds/{}", role), None)
            .await
    }

    pub async fn lease_call(&self, action: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, &format!("/v1/sys/leases/{}", action), Some(body))
            .await
    }
}

/// In-memory storage whose writes under `sys/lease/` always fail.
#[derive(Default)]
pub struct LeaseRejectingStorage {
    inner: InmemStorage,
}

#[async_trait]
impl Storage for LeaseRejectingStorage {
    async fn get(&self, key: &str) -> AppResult<Option<Vec<u8>>> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> AppResult<()> {
        if key.starts_with("sys/lease/") {
            return Err(AppError::Storage("lease table is read-only".to_string()));
        }
        self.inner.put(key, value).await
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.inner.delete(key).await
    }

    async fn list(&self, prefix: &str) -> AppResult<Vec<String>> {
        self.inner.list(prefix).await
    }
}

/// Count the requests the stub received with `method`.
pub async fn requests_with_method(server: &MockServer, method: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.method.as_str() == method)
        .count()
}

/// Answers every token creation with a new secret: `secret-0`, `secret-1`, ...
pub struct SequentialSecrets(AtomicUsize);

impl SequentialSecrets {
    pub fn new() -> Self {
        Self(AtomicUsize::new(0))
    }
}

impl Respond for SequentialSecrets {
    fn respond(&self, _request: &MockRequest) -> ResponseTemplate {
        let n = self.0.fetch_add(1, Ordering::SeqCst);
        ResponseTemplate::new(200).set_body_json(json!({
            "data": {"value": format!("secret-{}", n), "info": {}}
        }))
    }
}

/// Proxmox API stub that knows `alice@pve` and mints tokens for her.
pub async fn proxmox_stub() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/access/users/alice@pve"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"enable": 1}})))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path_regex(r"^/access/users/alice@pve/token/[a-p-]+$"))
        .respond_with(SequentialSecrets::new())
        .mount(&server)
        .await;

    server
}
