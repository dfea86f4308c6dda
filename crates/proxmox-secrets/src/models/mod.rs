//! Request, response and persisted record types.
//!
//! Every API operation has its own strongly-typed request structure; the
//! services never see a generic field bag.

pub mod config;
pub mod duration;
pub mod lease;
pub mod role;
pub mod secret;

use serde::{Deserialize, Serialize};

pub use config::{ConfigResponse, ConfigWriteRequest, ProxmoxConfig};
pub use lease::{LeaseEntry, LeaseLookupResponse, LeaseRequest, LeaseResponse};
pub use role::{RoleEntry, RoleWriteRequest};
pub use secret::{InternalData, Secret, SecretResponse};

/// Envelope for read responses: `{"data": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataResponse<T> {
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Key listing payload: `{"keys": [...]}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListResponse {
    pub keys: Vec<String>,
}
