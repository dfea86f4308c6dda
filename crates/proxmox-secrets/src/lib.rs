//! Proxmox Secrets Broker Library
//!
//! This crate provides a secrets broker that issues short-lived Proxmox VE
//! API tokens on demand:
//!
//! - **Connection Profile**: One admin token used to talk to the Proxmox API
//! - **Roles**: Named mappings to a Proxmox user plus lease durations
//! - **Credentials**: A fresh API token per request, bound to a lease
//! - **Leases**: Renewal, revocation and expiry sweeps that delete tokens remotely
//!
//! ## Architecture
//!
//! All records are JSON values behind the [`storage::Storage`] trait, kept in
//! memory or in PostgreSQL and optionally sealed with AES-256-GCM. Each
//! backend instance caches a single [`proxmox::ProxmoxClient`], rebuilt
//! whenever the connection profile changes.
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading from environment variables
//! - [`backend`]: Backend instance and client cache
//! - [`db`]: PostgreSQL pool and queries
//! - [`error`]: Custom error types with Axum integration
//! - [`handlers`]: HTTP route handlers
//! - [`proxmox`]: Proxmox API client
//! - [`services`]: Config, role, token and lease logic
//! - [`state`]: Shared application state
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use proxmox_secrets::{config::AppConfig, routes::build_router, state::AppState, storage::InmemStorage};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let state = AppState::new(Arc::new(InmemStorage::new()), AppConfig::from_env()?);
//!     let app = build_router(state);
//!     // ... bind and serve
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod proxmox;
pub mod result_ext;
pub mod routes;
pub mod services;
pub mod state;
pub mod storage;

pub use error::{AppError, AppResult};
pub use result_ext::ResultExt;
