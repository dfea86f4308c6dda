//! Error types for the Proxmox secrets broker.
//!
//! This module provides the error taxonomy shared by the storage layer,
//! the Proxmox client and the token lifecycle engine. Every variant
//! implements `IntoResponse` so Axum handlers can return it directly.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level errors for the broker.
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed or missing caller input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Referenced config, role or lease is absent
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// The Proxmox API call failed
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// A connection handle cannot be built from the current profile
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage collaborator failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Seal/unseal failure
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status the error is surfaced with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Config(_)
            | AppError::Storage(_)
            | AppError::Database(_)
            | AppError::Serialization(_)
            | AppError::Encryption(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_message = match &self {
            AppError::Validation(msg) | AppError::NotFound(msg) => msg.clone(),
            AppError::Upstream(msg) => {
                tracing::warn!(error = %msg, "Upstream error");
                msg.clone()
            }
            AppError::Config(msg) => {
                tracing::error!(error = %msg, "Configuration error");
                msg.clone()
            }
            AppError::Storage(msg) => {
                tracing::error!(error = %msg, "Storage error");
                msg.clone()
            }
            AppError::Encryption(msg) => {
                tracing::error!(error = %msg, "Encryption error");
                msg.clone()
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                msg.clone()
            }
            AppError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                self.to_string()
            }
            AppError::Serialization(e) => {
                tracing::error!(error = %e, "Serialization error");
                self.to_string()
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

/// Result type alias using AppError.
pub type AppResult<T> = Result<T, AppError>;

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<envy::Error> for AppError {
    fn from(err: envy::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Upstream(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let err = AppError::NotFound("role 'alice' not found".to_string());
        assert_eq!(err.to_string(), "Resource not found: role 'alice' not found");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_validation_is_client_error() {
        let err = AppError::Validation("missing user in role".to_string());
        assert_eq!(err.to_string(), "Validation error: missing user in role");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_upstream_maps_to_bad_gateway() {
        let err = AppError::Upstream("401 Unauthorized".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }
}
