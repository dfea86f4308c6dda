//! Role handlers.
//!
//! Role names in the path are lower-cased before any lookup.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::error::{AppError, AppResult};
use crate::models::{DataResponse, ListResponse, RoleEntry, RoleWriteRequest};
use crate::services::{normalize_role_name, RoleService};

/// List role names.
///
/// `GET /v1/{mount}/role`
pub async fn list(State(service): State<RoleService>) -> AppResult<Json<DataResponse<ListResponse>>> {
    let keys = service.list().await?;
    Ok(Json(DataResponse::new(ListResponse { keys })))
}

/// Read a role.
///
/// `GET /v1/{mount}/role/{name}`
pub async fn read(
    State(service): State<RoleService>,
    Path(name): Path<String>,
) -> AppResult<Json<DataResponse<RoleEntry>>> {
    let name = normalize_role_name(&name)?;
    let role = service
        .get(&name)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("role '{}' not found", name)))?;
    Ok(Json(DataResponse::new(role)))
}

/// Create a role, or update it if it exists.
///
/// `POST /v1/{mount}/role/{name}`
///
/// # Request Body
///
/// ```json
/// {"user": "alice", "realm": "pve", "ttl": "5m", "max_ttl": 3600}
/// ```
pub async fn write(
    State(service): State<RoleService>,
    Path(name): Path<String>,
    Json(request): Json<RoleWriteRequest>,
) -> AppResult<StatusCode> {
    let name = normalize_role_name(&name)?;
    service.write(&name, request).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Update fields of an existing role.
///
/// `PATCH /v1/{mount}/role/{name}`
pub async fn update(
    State(service): State<RoleService>,
    Path(name): Path<String>,
    Json(request): Json<RoleWriteRequest>,
) -> AppResult<StatusCode> {
    let name = normalize_role_name(&name)?;
    service.update(&name, request).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete a role.
///
/// `DELETE /v1/{mount}/role/{name}`
pub async fn delete(
    State(service): State<RoleService>,
    Path(name): Path<String>,
) -> AppResult<StatusCode> {
    let name = normalize_role_name(&name)?;
    service.delete(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}
