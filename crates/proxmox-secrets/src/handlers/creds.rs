//! Credential issuance handler.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::error::AppResult;
use crate::models::LeaseResponse;
use crate::result_ext::ResultExt;
use crate::services::normalize_role_name;
use crate::state::AppState;

/// Issue a Proxmox API token for a role.
///
/// When the lease cannot be recorded the token is deleted again before
/// the error is returned.
///
/// `GET|POST /v1/{mount}/creds/{name}`
///
/// # Response
///
/// ```json
/// {
///   "lease_id": "proxmox/creds/alice/6f1d...",
///   "lease_duration": 300,
///   "renewable": true,
///   "data": {
///     "token_id": "gbcd...",
///     "token_id_full": "alice@pve!gbcd...",
///     "secret": "..."
///   }
/// }
/// ```
pub async fn issue(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<LeaseResponse>> {
    let name = normalize_role_name(&name)?;
    let issued = state.tokens.issue(&name).await?;
    let secret = issued.secret.clone();

    match state.leases.register(&format!("creds/{}", name), issued).await {
        Ok(lease) => Ok(Json(lease)),
        Err(e) => {
            // No lease will ever revoke this token, so delete it now.
            let _ = state
                .tokens
                .revoke_token(&secret)
                .await
                .log(format!("revoking unleased token of role {}", name));
            Err(e)
        }
    }
}
