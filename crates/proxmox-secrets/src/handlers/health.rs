//! Health check endpoints.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    /// Health status ("ok" or "unhealthy")
    pub status: String,
}

/// Detailed health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct SysHealthResponse {
    /// Overall health status
    pub status: String,

    /// Storage reachability
    pub storage: String,

    /// Mount path the API is served under
    pub mount: String,

    /// Whether a Proxmox client is currently cached
    pub client_cached: bool,

    /// Number of stored leases
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leases: Option<usize>,

    /// Server uptime in seconds
    pub uptime_seconds: u64,

    /// Server version
    pub version: String,
}

/// Basic health check endpoint.
///
/// `GET /health`
///
/// Returns quickly and touches nothing, suitable for load balancers.
pub async fn health_check() -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse {
        status: "ok".to_string(),
    })
}

/// Detailed health check endpoint.
///
/// `GET /v1/sys/health`
///
/// # Returns
///
/// - `200 OK` when storage is reachable
/// - `503 Service Unavailable` otherwise
pub async fn sys_health(State(state): State<AppState>) -> (StatusCode, Json<SysHealthResponse>) {
    let storage_healthy = match state.backend.storage().ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Storage health check failed");
            false
        }
    };

    let leases = if storage_healthy {
        state.leases.count().await.ok()
    } else {
        None
    };

    let status_code = if storage_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = SysHealthResponse {
        status: if storage_healthy { "ok" } else { "unhealthy" }.to_string(),
        storage: if storage_healthy {
            "connected"
        } else {
            "disconnected"
        }
        .to_string(),
        mount: state.config.mount_path().to_string(),
        client_cached: state.backend.has_cached_client().await,
        leases,
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (status_code, Json(response))
}
