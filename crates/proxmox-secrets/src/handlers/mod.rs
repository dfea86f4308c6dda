//! HTTP handlers for the broker API.
//!
//! This module contains all route handlers organized by resource.

pub mod config;
pub mod creds;
pub mod health;
pub mod leases;
pub mod roles;

pub use health::{health_check, sys_health};
