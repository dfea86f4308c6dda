//! Process configuration for the Proxmox secrets broker.
//!
//! Configuration is loaded from environment variables using the `envy`
//! crate. This is the broker's own runtime configuration; the Proxmox
//! connection profile is managed through the `config` API path instead.

mod app;
mod database;

pub use app::{AppConfig, StorageKind};
pub use database::DatabaseConfig;
