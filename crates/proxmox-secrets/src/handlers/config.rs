//! Connection profile handlers.

use axum::{extract::State, http::StatusCode, Json};

use crate::error::AppResult;
use crate::models::{ConfigResponse, ConfigWriteRequest, DataResponse};
use crate::services::ConfigService;

/// Read the connection profile.
///
/// `GET /v1/{mount}/config`
///
/// The admin token secret is never returned. When no profile is stored
/// every field carries its zero value.
pub async fn read(
    State(service): State<ConfigService>,
) -> AppResult<Json<DataResponse<ConfigResponse>>> {
    let config = service.read().await?;
    Ok(Json(DataResponse::new(config)))
}

/// Create the profile, or update it if one exists.
///
/// `POST /v1/{mount}/config`
///
/// # Request Body
///
/// ```json
/// {
///   "user": "root",
///   "realm": "pam",
///   "token_id": "broker",
///   "token_secret": "5f1c...",
///   "proxmox_url": "https://pve.example.com:8006/api2/json",
///   "insecure_skip_tls_verify": false,
///   "timeout": 120
/// }
/// ```
pub async fn write(
    State(service): State<ConfigService>,
    Json(request): Json<ConfigWriteRequest>,
) -> AppResult<StatusCode> {
    service.write(request).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Update fields of the stored profile.
///
/// `PATCH /v1/{mount}/config`
pub async fn update(
    State(service): State<ConfigService>,
    Json(request): Json<ConfigWriteRequest>,
) -> AppResult<StatusCode> {
    service.update(request).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete the profile.
///
/// `DELETE /v1/{mount}/config`
pub async fn delete(State(service): State<ConfigService>) -> AppResult<StatusCode> {
    service.delete().await?;
    Ok(StatusCode::NO_CONTENT)
}
