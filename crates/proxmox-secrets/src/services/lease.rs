//! Lease manager.
//!
//! Every issued secret gets a lease record persisted under `sys/lease/`.
//! The manager owns lease arithmetic (effective TTL, maximum TTL, renewal
//! caps) and hands revocation and renewal to the [`SecretBackend`]
//! registered for the secret's type.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::duration::MAX_DURATION_SECONDS;
use crate::models::{
    LeaseEntry, LeaseLookupResponse, LeaseResponse, Secret, SecretResponse,
};
use crate::result_ext::ResultExt;
use crate::storage::{get_json, put_json, Storage};

/// Storage prefix of lease records.
pub const LEASE_STORAGE_PREFIX: &str = "sys/lease/";

const REDACTED: &str = "********";


/// A secret type the lease manager can revoke and renew.
#[async_trait]
pub trait SecretBackend: Send + Sync {
    /// Type tag carried by every [`Secret`] this backend issues.
    fn secret_type(&self) -> &'static str;

    /// Response fields that must never reach a log line.
    fn sensitive_fields(&self) -> &'static [&'static str] {
        &[]
    }

    /// Destroy the remote credential behind `secret`.
    async fn revoke(&self, secret: &Secret) -> AppResult<()>;

    /// Produce the secret with refreshed lease durations.
    async fn renew(&self, secret: &Secret) -> AppResult<Secret>;
}

/// System-wide lease limits in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaseDefaults {
    pub default_ttl: u64,
    pub max_ttl: u64,
}

/// Lease bookkeeping for one mount.
pub struct LeaseManager {
    storage: Arc<dyn Storage>,
    mount: String,
    defaults: LeaseDefaults,
    backends: HashMap<String, Arc<dyn SecretBackend>>,
}

impl LeaseManager {
    pub fn new(storage: Arc<dyn Storage>, mount: impl Into<String>, defaults: LeaseDefaults) -> Self {
        Self {
            storage,
            mount: mount.into(),
            defaults,
            backends: HashMap::new(),
        }
    }

    /// Register a secret type.
    pub fn register_backend(&mut self, backend: Arc<dyn SecretBackend>) {
        self.backends
            .insert(backend.secret_type().to_string(), backend);
    }

    pub fn defaults(&self) -> LeaseDefaults {
        self.defaults
    }

    fn backend(&self, secret_type: &str) -> AppResult<Arc<dyn SecretBackend>> {
        self.backends.get(secret_type).cloned().ok_or_else(|| {
            AppError::Internal(format!("no backend registered for secret type '{}'", secret_type))
        })
    }

    /// Effective `(ttl, max_ttl)` of a secret after applying system limits.
    pub fn effective_durations(&self, secret: &Secret) -> (u64, u64) {
        let max_ttl = if secret.max_ttl > 0 {
            secret.max_ttl.min(self.defaults.max_ttl)
        } else {
            self.defaults.max_ttl
        };
        let ttl = if secret.ttl > 0 {
            secret.ttl
        } else {
            self.defaults.default_ttl
        };
        (ttl.min(max_ttl), max_ttl)
    }

    /// Persist a lease for a freshly issued secret.
    pub async fn register(&self, path: &str, response: SecretResponse) -> AppResult<LeaseResponse> {
        self.register_at(path, response, Utc::now()).await
    }

    pub(crate) async fn register_at(
        &self,
        path: &str,
        response: SecretResponse,
        now: DateTime<Utc>,
    ) -> AppResult<LeaseResponse> {
        let id = Uuid::new_v4();
        let lease_id = format!("{}/{}/{}", self.mount, path.trim_matches('/'), id);
        let (ttl, max_ttl) = self.effective_durations(&response.secret);

        let entry = LeaseEntry {
            lease_id: lease_id.clone(),
            path: path.to_string(),
            secret: response.secret,
            issue_time: now,
            expire_time: now + seconds(ttl),
            last_renewal_time: None,
            max_ttl,
        };
        put_json(self.storage.as_ref(), &lease_key(&id), &entry).await?;

        let sensitive = self
            .backends
            .get(&entry.secret.secret_type)
            .map(|b| b.sensitive_fields())
            .unwrap_or_default();
        tracing::info!(
            lease_id = %lease_id,
            ttl,
            max_ttl,
            data = %redact(&response.data, sensitive),
            "Lease registered"
        );

        Ok(LeaseResponse {
            lease_id,
            lease_duration: ttl,
            renewable: entry.secret.renewable,
            data: response.data,
        })
    }

    /// Extend a lease.
    ///
    /// The secret type re-resolves the lease durations; the new expiry is
    /// `now + increment` (or the renewed TTL when no increment is given),
    /// capped at `issue_time + max_ttl`.
    pub async fn renew(&self, lease_id: &str, increment: Option<u64>) -> AppResult<LeaseResponse> {
        self.renew_at(lease_id, increment, Utc::now()).await
    }

    pub(crate) async fn renew_at(
        &self,
        lease_id: &str,
        increment: Option<u64>,
        now: DateTime<Utc>,
    ) -> AppResult<LeaseResponse> {
        let (id, mut entry) = self.load(lease_id).await?;

        if entry.is_expired(now) {
            return Err(AppError::Validation(format!("lease '{}' has expired", lease_id)));
        }
        if !entry.secret.renewable {
            return Err(AppError::Validation(format!(
                "lease '{}' is not renewable",
                lease_id
            )));
        }

        let backend = self.backend(&entry.secret.secret_type)?;
        let renewed = backend.renew(&entry.secret).await?;
        let (ttl, max_ttl) = self.effective_durations(&renewed);

        let extension = increment.filter(|i| *i > 0).unwrap_or(ttl);
        let cap = entry.issue_time + seconds(max_ttl);
        entry.expire_time = (now + seconds(extension)).min(cap);
        entry.last_renewal_time = Some(now);
        entry.max_ttl = max_ttl;
        entry.secret = renewed;

        put_json(self.storage.as_ref(), &lease_key(&id), &entry).await?;

        let lease_duration = entry.remaining_seconds(now);
        tracing::info!(lease_id = %lease_id, lease_duration, "Lease renewed");

        Ok(LeaseResponse {
            lease_id: entry.lease_id,
            lease_duration,
            renewable: entry.secret.renewable,
            data: serde_json::Map::new(),
        })
    }

    /// Revoke a lease and destroy the remote credential.
    ///
    /// The record is deleted only once the secret type revoked successfully.
    pub async fn revoke(&self, lease_id: &str) -> AppResult<()> {
        let (id, entry) = self.load(lease_id).await?;
        self.revoke_entry(&id, &entry).await
    }

    async fn revoke_entry(&self, id: &Uuid, entry: &LeaseEntry) -> AppResult<()> {
        let backend = self.backend(&entry.secret.secret_type)?;
        backend.revoke(&entry.secret).await?;
        self.storage.delete(&lease_key(id)).await?;

        tracing::info!(lease_id = %entry.lease_id, "Lease revoked");
        Ok(())
    }

    /// Lease metadata, without any secret data.
    pub async fn lookup(&self, lease_id: &str) -> AppResult<LeaseLookupResponse> {
        self.lookup_at(lease_id, Utc::now()).await
    }

    pub(crate) async fn lookup_at(
        &self,
        lease_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<LeaseLookupResponse> {
        let (_, entry) = self.load(lease_id).await?;
        Ok(LeaseLookupResponse {
            ttl: entry.remaining_seconds(now),
            id: entry.lease_id,
            issue_time: entry.issue_time,
            expire_time: entry.expire_time,
            last_renewal: entry.last_renewal_time,
            renewable: entry.secret.renewable,
        })
    }

    /// Revoke every expired lease. Returns how many were revoked.
    ///
    /// A lease whose revocation fails stays in place for the next sweep.
    pub async fn revoke_expired(&self) -> AppResult<usize> {
        self.revoke_expired_at(Utc::now()).await
    }

    pub(crate) async fn revoke_expired_at(&self, now: DateTime<Utc>) -> AppResult<usize> {
        let mut revoked = 0;

        for key in self.storage.list(LEASE_STORAGE_PREFIX).await? {
            let Ok(id) = Uuid::parse_str(&key) else {
                tracing::warn!(key = %key, "Skipping malformed lease key");
                continue;
            };
            let entry = match get_json::<LeaseEntry>(self.storage.as_ref(), &lease_key(&id))
                .await
                .log(format!("reading lease record {}", key))
            {
                Ok(Some(entry)) => entry,
                Ok(None) | Err(_) => continue,
            };
            if !entry.is_expired(now) {
                continue;
            }
            if self
                .revoke_entry(&id, &entry)
                .await
                .log(format!("revoking expired lease {}", entry.lease_id))
                .is_ok()
            {
                revoked += 1;
            }
        }

        if revoked > 0 {
            tracing::info!(revoked, "Expired leases revoked");
        }
        Ok(revoked)
    }

    /// Number of lease records currently stored.
    pub async fn count(&self) -> AppResult<usize> {
        Ok(self.storage.list(LEASE_STORAGE_PREFIX).await?.len())
    }

    async fn load(&self, lease_id: &str) -> AppResult<(Uuid, LeaseEntry)> {
        if lease_id.trim().is_empty() {
            return Err(AppError::Validation("missing lease_id".to_string()));
        }

        let not_found = || AppError::NotFound(format!("lease '{}' not found", lease_id));
        let id = lease_id
            .rsplit('/')
            .next()
            .and_then(|tail| Uuid::parse_str(tail).ok())
            .ok_or_else(not_found)?;

        let entry: LeaseEntry = get_json(self.storage.as_ref(), &lease_key(&id))
            .await?
            .ok_or_else(not_found)?;
        if entry.lease_id != lease_id {
            return Err(not_found());
        }

        Ok((id, entry))
    }
}

impl std::fmt::Debug for LeaseManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeaseManager")
            .field("mount", &self.mount)
            .field("defaults", &self.defaults)
            .field("backends", &self.backends.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn lease_key(id: &Uuid) -> String {
    format!("{}{}", LEASE_STORAGE_PREFIX, id)
}

fn seconds(value: u64) -> Duration {
    Duration::seconds(value.min(MAX_DURATION_SECONDS) as i64)
}

/// Render response data for logging with sensitive values masked.
fn redact(data: &serde_json::Map<String, serde_json::Value>, sensitive: &[&str]) -> serde_json::Value {
    data.iter()
        .map(|(k, v)| {
            let value = if sensitive.contains(&k.as_str()) {
                serde_json::Value::String(REDACTED.to_string())
            } else {
                v.clone()
            };
            (k.clone(), value)
        })
        .collect::<serde_json::Map<_, _>>()
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InternalData;
    use crate::storage::InmemStorage;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Secret type that records calls and renews to fixed durations.
    #[derive(Default)]
    struct MockBackend {
        revoked: AtomicUsize,
        fail_revoke: AtomicBool,
        renew_ttl: u64,
        renew_max_ttl: u64,
    }

    #[async_trait]
    impl SecretBackend for MockBackend {
        fn secret_type(&self) -> &'static str {
            "mock"
        }

        fn sensitive_fields(&self) -> &'static [&'static str] {
            &["secret"]
        }

        async fn revoke(&self, _secret: &Secret) -> AppResult<()> {
            if self.fail_revoke.load(Ordering::SeqCst) {
                return Err(AppError::Upstream("remote unavailable".to_string()));
            }
            self.revoked.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn renew(&self, secret: &Secret) -> AppResult<Secret> {
            let mut renewed = secret.clone();
            renewed.ttl = self.renew_ttl;
            renewed.max_ttl = self.renew_max_ttl;
            Ok(renewed)
        }
    }

    const DEFAULTS: LeaseDefaults = LeaseDefaults {
        default_ttl: 3600,
        max_ttl: 7200,
    };

    fn manager(backend: Arc<MockBackend>) -> LeaseManager {
        let mut manager = LeaseManager::new(Arc::new(InmemStorage::new()), "proxmox", DEFAULTS);
        manager.register_backend(backend);
        manager
    }

    fn issued(ttl: u64, max_ttl: u64) -> SecretResponse {
        let mut data = serde_json::Map::new();
        data.insert("secret".to_string(), json!("s3cr3t"));
        let mut secret = Secret::new("mock", InternalData::new());
        secret.ttl = ttl;
        secret.max_ttl = max_ttl;
        SecretResponse { data, secret }
    }

    #[test]
    fn test_effective_durations() {
        let manager = manager(Arc::default());
        let secret = |ttl, max_ttl| Secret {
            ttl,
            max_ttl,
            ..Secret::new("mock", InternalData::new())
        };

        assert_eq!(manager.effective_durations(&secret(0, 0)), (3600, 7200));
        assert_eq!(manager.effective_durations(&secret(300, 0)), (300, 7200));
        assert_eq!(manager.effective_durations(&secret(300, 100)), (100, 100));
        assert_eq!(manager.effective_durations(&secret(0, 99_999)), (3600, 7200));
        assert_eq!(manager.effective_durations(&secret(10_000, 0)), (7200, 7200));
    }

    #[test]
    fn test_redact_masks_sensitive_fields() {
        let mut data = serde_json::Map::new();
        data.insert("token_id".to_string(), json!("abc"));
        data.insert("secret".to_string(), json!("s3cr3t"));

        let rendered = redact(&data, &["secret"]);
        assert_eq!(rendered, json!({"token_id": "abc", "secret": "********"}));
    }

    #[tokio::test]
    async fn test_register_and_lookup() {
        let manager = manager(Arc::default());
        let now = Utc::now();

        let lease = manager
            .register_at("creds/alice", issued(300, 0), now)
            .await
            .unwrap();
        assert!(lease.lease_id.starts_with("proxmox/creds/alice/"));
        assert_eq!(lease.lease_duration, 300);
        assert!(lease.renewable);
        assert_eq!(lease.data["secret"], "s3cr3t");

        let info = manager.lookup_at(&lease.lease_id, now).await.unwrap();
        assert_eq!(info.id, lease.lease_id);
        assert_eq!(info.ttl, 300);
        assert_eq!(info.expire_time, now + Duration::seconds(300));
        assert!(info.last_renewal.is_none());
    }

    #[tokio::test]
    async fn test_unknown_lease_is_not_found() {
        let manager = manager(Arc::default());

        let unknown = format!("proxmox/creds/alice/{}", Uuid::new_v4());
        for lease_id in ["proxmox/creds/alice/nope", unknown.as_str()] {
            assert!(matches!(
                manager.lookup(lease_id).await.unwrap_err(),
                AppError::NotFound(_)
            ));
            assert!(matches!(
                manager.revoke(lease_id).await.unwrap_err(),
                AppError::NotFound(_)
            ));
        }
        assert!(matches!(
            manager.renew("", None).await.unwrap_err(),
            AppError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn test_lease_id_must_match_record() {
        let manager = manager(Arc::default());
        let lease = manager.register("creds/alice", issued(300, 0)).await.unwrap();
        let id = lease.lease_id.rsplit('/').next().unwrap();

        let err = manager
            .lookup(&format!("proxmox/creds/bob/{}", id))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_renew_applies_renewed_ttl_and_caps_at_max() {
        let backend = Arc::new(MockBackend {
            renew_ttl: 600,
            renew_max_ttl: 1000,
            ..MockBackend::default()
        });
        let manager = manager(backend);
        let issue = Utc::now();

        let lease = manager
            .register_at("creds/alice", issued(300, 0), issue)
            .await
            .unwrap();

        let later = issue + Duration::seconds(100);
        let renewed = manager.renew_at(&lease.lease_id, None, later).await.unwrap();
        assert_eq!(renewed.lease_duration, 600);
        assert!(renewed.data.is_empty());

        let info = manager.lookup_at(&lease.lease_id, later).await.unwrap();
        assert_eq!(info.last_renewal, Some(later));
        assert_eq!(info.expire_time, later + Duration::seconds(600));

        let near_cap = issue + Duration::seconds(650);
        let capped = manager
            .renew_at(&lease.lease_id, Some(5000), near_cap)
            .await
            .unwrap();
        assert_eq!(capped.lease_duration, 350);
    }

    #[tokio::test]
    async fn test_renew_expired_lease_fails() {
        let manager = manager(Arc::default());
        let issue = Utc::now();
        let lease = manager
            .register_at("creds/alice", issued(60, 0), issue)
            .await
            .unwrap();

        let err = manager
            .renew_at(&lease.lease_id, None, issue + Duration::seconds(61))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_failed_revoke_keeps_record() {
        let backend = Arc::new(MockBackend::default());
        let manager = manager(backend.clone());
        let lease = manager.register("creds/alice", issued(300, 0)).await.unwrap();

        backend.fail_revoke.store(true, Ordering::SeqCst);
        assert!(matches!(
            manager.revoke(&lease.lease_id).await.unwrap_err(),
            AppError::Upstream(_)
        ));
        assert_eq!(manager.count().await.unwrap(), 1);

        backend.fail_revoke.store(false, Ordering::SeqCst);
        manager.revoke(&lease.lease_id).await.unwrap();
        assert_eq!(manager.count().await.unwrap(), 0);
        assert_eq!(backend.revoked.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_revoke_expired_sweeps_only_expired() {
        let backend = Arc::new(MockBackend::default());
        let manager = manager(backend.clone());
        let issue = Utc::now();

        manager
            .register_at("creds/alice", issued(60, 0), issue)
            .await
            .unwrap();
        let kept = manager
            .register_at("creds/bob", issued(600, 0), issue)
            .await
            .unwrap();

        let swept = manager
            .revoke_expired_at(issue + Duration::seconds(120))
            .await
            .unwrap();
        assert_eq!(swept, 1);
        assert_eq!(backend.revoked.load(Ordering::SeqCst), 1);
        assert_eq!(manager.count().await.unwrap(), 1);
        assert!(manager.lookup(&kept.lease_id).await.is_ok());
    }

    #[tokio::test]
    async fn test_unregistered_secret_type_is_internal_error() {
        let manager = LeaseManager::new(Arc::new(InmemStorage::new()), "proxmox", DEFAULTS);
        let lease = manager.register("creds/alice", issued(300, 0)).await.unwrap();

        assert!(matches!(
            manager.revoke(&lease.lease_id).await.unwrap_err(),
            AppError::Internal(_)
        ));
    }
}
