//! Proxmox VE API access.
//!
//! [`ProxmoxClient`] is the connection handle: a `reqwest` client bound to
//! one connection profile. It exposes only the user and API token calls
//! the token engine needs.

mod client;
mod types;

pub use client::{parse_http_headers, ProxmoxClient};
pub use types::{ApiTokenSpec, UserId};
