//! Service layer for the Proxmox secrets broker.
//!
//! Services hold the business rules and sit between the HTTP handlers
//! and storage. The token engine plugs into the lease manager as a
//! [`SecretBackend`].

pub mod config;
pub mod lease;
pub mod role;
pub mod token;

pub use config::ConfigService;
pub use lease::{LeaseDefaults, LeaseManager, SecretBackend};
pub use role::{normalize_role_name, RoleService};
pub use token::{generate_token_id, TokenService};
