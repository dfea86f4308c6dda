//! Role service.

use std::sync::LazyLock;

use regex::Regex;

use crate::backend::{Backend, ROLE_STORAGE_PREFIX};
use crate::error::{AppError, AppResult};
use crate::models::duration::MAX_DURATION_SECONDS;
use crate::models::{RoleEntry, RoleWriteRequest};
use crate::storage::{get_json, put_json};

static ROLE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\w(?:[\w.-]*\w)?$").expect("role name pattern is valid"));

/// Proxmox user names: no whitespace, and none of the characters that
/// delimit a user id, a token id or a URL path.
static USER_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s/?#@!:%]+$").expect("user name pattern is valid"));

static REALM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9._-]*$").expect("realm pattern is valid"));

/// Lower-case a role name from a request path and check its shape.
pub fn normalize_role_name(raw: &str) -> AppResult<String> {
    let name = raw.trim().to_lowercase();
    if name.is_empty() {
        return Err(AppError::Validation("missing role name".to_string()));
    }
    if !ROLE_NAME.is_match(&name) {
        return Err(AppError::Validation(format!("invalid role name '{}'", raw)));
    }
    Ok(name)
}

fn role_key(name: &str) -> String {
    format!("{}{}", ROLE_STORAGE_PREFIX, name)
}

/// Service for role operations.
#[derive(Clone)]
pub struct RoleService {
    backend: Backend,
}

impl RoleService {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    /// Fetch a role. Unknown names yield `Ok(None)`.
    pub async fn get(&self, name: &str) -> AppResult<Option<RoleEntry>> {
        if name.is_empty() {
            return Err(AppError::Validation("missing role name".to_string()));
        }
        get_json(self.backend.storage(), &role_key(name)).await
    }

    /// Fetch a role that must exist.
    pub async fn require(&self, name: &str) -> AppResult<RoleEntry> {
        self.get(name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{}' not found", name)))
    }

    /// Create the role, or update it when it already exists.
    pub async fn write(&self, name: &str, request: RoleWriteRequest) -> AppResult<RoleEntry> {
        let existing = self.get(name).await?;
        let create = existing.is_none();
        self.apply(name, existing, request, create).await
    }

    /// Update an existing role.
    ///
    /// # Errors
    ///
    /// `AppError::NotFound` when the role does not exist.
    pub async fn update(&self, name: &str, request: RoleWriteRequest) -> AppResult<RoleEntry> {
        let existing = self.require(name).await?;
        self.apply(name, Some(existing), request, false).await
    }

    /// Delete a role. Deleting an unknown role succeeds.
    pub async fn delete(&self, name: &str) -> AppResult<()> {
        self.backend.storage().delete(&role_key(name)).await?;
        tracing::info!(role = %name, "Role deleted");
        Ok(())
    }

    /// All role names, sorted.
    pub async fn list(&self) -> AppResult<Vec<String>> {
        self.backend.storage().list(ROLE_STORAGE_PREFIX).await
    }

    async fn apply(
        &self,
        name: &str,
        existing: Option<RoleEntry>,
        request: RoleWriteRequest,
        create: bool,
    ) -> AppResult<RoleEntry> {
        let mut role = existing.unwrap_or_else(|| RoleEntry {
            name: name.to_string(),
            ..RoleEntry::default()
        });

        match request.user.filter(|u| !u.is_empty()) {
            Some(user) => role.user = user,
            None if create => return Err(AppError::Validation("missing user in role".to_string())),
            None => {}
        }

        match request.realm.filter(|r| !r.is_empty()) {
            Some(realm) => role.realm = realm,
            None if create => return Err(AppError::Validation("missing realm in role".to_string())),
            None => {}
        }

        if let Some(ttl) = request.ttl {
            role.ttl = ttl;
        } else if create {
            role.ttl = 0;
        }

        if let Some(max_ttl) = request.max_ttl {
            role.max_ttl = max_ttl;
        } else if create {
            role.max_ttl = 0;
        }

        if !USER_NAME.is_match(&role.user) {
            return Err(AppError::Validation(format!("invalid user '{}' in role", role.user)));
        }
        if !REALM.is_match(&role.realm) {
            return Err(AppError::Validation(format!("invalid realm '{}' in role", role.realm)));
        }

        for (field, value) in [("ttl", role.ttl), ("max_ttl", role.max_ttl)] {
            if value > MAX_DURATION_SECONDS {
                return Err(AppError::Validation(format!(
                    "{} cannot exceed {} seconds",
                    field, MAX_DURATION_SECONDS
                )));
            }
        }

        if role.max_ttl != 0 && role.ttl > role.max_ttl {
            return Err(AppError::Validation(
                "ttl cannot be greater than max_ttl".to_string(),
            ));
        }

        put_json(self.backend.storage(), &role_key(name), &role).await?;

        tracing::info!(
            role = %role.name,
            user = %role.user,
            realm = %role.realm,
            ttl = role.ttl,
            max_ttl = role.max_ttl,
            create,
            "Role written"
        );

        Ok(role)
    }
}
