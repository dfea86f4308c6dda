//! Lease handlers under `/v1/sys/leases`.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};

use crate::error::AppResult;
use crate::models::{DataResponse, LeaseLookupResponse, LeaseRequest, LeaseResponse};
use crate::services::LeaseManager;

/// Renew a lease.
///
/// `POST /v1/sys/leases/renew`
///
/// # Request Body
///
/// ```json
/// {"lease_id": "proxmox/creds/alice/6f1d...", "increment": "1h"}
/// ```
pub async fn renew(
    State(leases): State<Arc<LeaseManager>>,
    Json(request): Json<LeaseRequest>,
) -> AppResult<Json<LeaseResponse>> {
    let lease = leases.renew(&request.lease_id, request.increment).await?;
    Ok(Json(lease))
}

/// Revoke a lease and delete its token on Proxmox.
///
/// `POST /v1/sys/leases/revoke`
pub async fn revoke(
    State(leases): State<Arc<LeaseManager>>,
    Json(request): Json<LeaseRequest>,
) -> AppResult<StatusCode> {
    leases.revoke(&request.lease_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Lease metadata.
///
/// `POST /v1/sys/leases/lookup`
pub async fn lookup(
    State(leases): State<Arc<LeaseManager>>,
    Json(request): Json<LeaseRequest>,
) -> AppResult<Json<DataResponse<LeaseLookupResponse>>> {
    let info = leases.lookup(&request.lease_id).await?;
    Ok(Json(DataResponse::new(info)))
}
