//! # Role Store
//!
//! Role to member-set assignments kept in shared storage.
//!
//! Every role except `root` is persisted as a JSON array of principal ids
//! under `<prefix>:role:<role>`. The `root` role is never read from or
//! written to storage: it always resolves to the principal configured at
//! startup.

use serde::de::DeserializeOwned;
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use warden_store::{CasOutcome, KeyValueStore};

use crate::error::{RbacError, RbacResult};
use crate::retry::{with_retry, RetryConfig};
use crate::types::{Principal, RoleName};

/// Role store configuration.
#[derive(Debug, Clone)]
pub struct RoleStoreConfig {
    /// Prefix of every storage key (default: "rbac").
    pub key_prefix: String,

    /// Time budget for each storage call (default: 5s).
    pub io_timeout: Duration,

    /// Backoff for conflicting conditional writes.
    pub retry: RetryConfig,
}

impl Default for RoleStoreConfig {
    fn default() -> Self {
        Self {
            key_prefix: "rbac".to_string(),
            io_timeout: Duration::from_secs(5),
            retry: RetryConfig::default(),
        }
    }
}

/// Where the members of a role come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleSource {
    /// Fixed single member from configuration (the `root` role)
    Static(Principal),
    /// Member set persisted under `key`
    Persisted {
        /// Storage key
        key: String,
    },
}

/// Result of a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantOutcome {
    /// The principal was added
    Granted,
    /// The principal already held the role; nothing was written
    AlreadyAssigned,
}

/// Result of a revoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevokeOutcome {
    /// The principal was removed
    Revoked,
    /// The principal did not hold the role; nothing was written
    NotAssigned,
}

/// Role assignment store.
///
/// Cloning is cheap; clones share the same backend.
#[derive(Clone)]
pub struct RoleStore {
    backend: Arc<dyn KeyValueStore>,
    root: Principal,
    config: RoleStoreConfig,
}

impl std::fmt::Debug for RoleStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleStore")
            .field("root", &self.root)
            .field("config", &self.config)
            .finish()
    }
}

impl RoleStore {
    /// Create a role store with default configuration.
    pub fn new(backend: Arc<dyn KeyValueStore>, root: Principal) -> Self {
        Self::with_config(backend, root, RoleStoreConfig::default())
    }

    /// Create a role store with custom configuration.
    pub fn with_config(
        backend: Arc<dyn KeyValueStore>,
        root: Principal,
        config: RoleStoreConfig,
    ) -> Self {
        Self {
            backend,
            root,
            config,
        }
    }

    /// The configured root principal.
    pub fn root_principal(&self) -> &Principal {
        &self.root
    }

    /// Storage key for a role, e.g. `rbac:role:admin`.
    pub fn key_for(&self, role: &RoleName) -> String {
        format!("{}:role:{}", self.config.key_prefix, role)
    }

    /// Resolve where the members of `role` come from.
    pub fn source(&self, role: &RoleName) -> RoleSource {
        if role.is_root() {
            RoleSource::Static(self.root.clone())
        } else {
            RoleSource::Persisted {
                key: self.key_for(role),
            }
        }
    }

    /// Get the principals currently holding `role`.
    ///
    /// An absent storage entry is an empty set.
    pub async fn members(&self, role: &RoleName) -> RbacResult<BTreeSet<Principal>> {
        match self.source(role) {
            RoleSource::Static(principal) => Ok(BTreeSet::from([principal])),
            RoleSource::Persisted { key } => {
                let (members, _) = self.read(&key).await?;
                tracing::debug!(role = %role, count = members.len(), "Resolved role members");
                Ok(members)
            }
        }
    }

    /// Check if `principal` currently holds `role`.
    pub async fn has_role(&self, role: &RoleName, principal: &Principal) -> RbacResult<bool> {
        Ok(self.members(role).await?.contains(principal))
    }

    /// Grant `role` to `principal`.
    ///
    /// # Errors
    ///
    /// `ReservedRoleViolation` for `root`; storage, timeout and conflict
    /// errors otherwise.
    pub async fn grant(&self, role: &RoleName, principal: &Principal) -> RbacResult<GrantOutcome> {
        let key = self.persisted_key(role)?;

        let changed = self
            .update(role, &key, |members| members.insert(principal.clone()))
            .await?;

        if changed {
            tracing::info!(role = %role, principal = %principal, "Role granted");
            Ok(GrantOutcome::Granted)
        } else {
            Ok(GrantOutcome::AlreadyAssigned)
        }
    }

    /// Revoke `role` from `principal`.
    ///
    /// Revoking the last member leaves an empty set stored under the key.
    ///
    /// # Errors
    ///
    /// `ReservedRoleViolation` for `root`; storage, timeout and conflict
    /// errors otherwise.
    pub async fn revoke(&self, role: &RoleName, principal: &Principal) -> RbacResult<RevokeOutcome> {
        let key = self.persisted_key(role)?;

        let changed = self
            .update(role, &key, |members| members.remove(principal))
            .await?;

        if changed {
            tracing::info!(role = %role, principal = %principal, "Role revoked");
            Ok(RevokeOutcome::Revoked)
        } else {
            Ok(RevokeOutcome::NotAssigned)
        }
    }

    fn persisted_key(&self, role: &RoleName) -> RbacResult<String> {
        match self.source(role) {
            RoleSource::Static(_) => Err(RbacError::ReservedRoleViolation(role.to_string())),
            RoleSource::Persisted { key } => Ok(key),
        }
    }

    /// Read-modify-write of a member set under optimistic concurrency.
    ///
    /// `apply` returns whether it changed the set; an unchanged set is not
    /// written back. Returns whether a write landed.
    async fn update<F>(&self, role: &RoleName, key: &str, apply: F) -> RbacResult<bool>
    where
        F: Fn(&mut BTreeSet<Principal>) -> bool,
    {
        let apply = &apply;

        with_retry(&self.config.retry, Attempt::is_conflict, move || async move {
            let (mut members, version) = self.read(key).await.map_err(Attempt::Failed)?;

            if !apply(&mut members) {
                return Ok(false);
            }

            let bytes = serde_json::to_vec(&members).map_err(|e| {
                Attempt::Failed(RbacError::Corrupt {
                    key: key.to_string(),
                    reason: e.to_string(),
                })
            })?;

            let outcome = self
                .timed("write", self.backend.compare_and_set(key, version, bytes))
                .await
                .map_err(Attempt::Failed)?
                .map_err(|e| Attempt::Failed(e.into()))?;

            match outcome {
                CasOutcome::Applied { .. } => Ok(true),
                CasOutcome::Conflict { current } => {
                    tracing::debug!(
                        role = %role,
                        expected = ?version,
                        current = ?current,
                        "Concurrent role update"
                    );
                    Err(Attempt::Conflict)
                }
            }
        })
        .await
        .map_err(|attempt| match attempt {
            Attempt::Conflict => RbacError::Conflict {
                role: role.to_string(),
                attempts: self.config.retry.attempts(),
            },
            Attempt::Failed(e) => e,
        })
    }

    /// Read and decode a member set together with its version.
    async fn read(&self, key: &str) -> RbacResult<(BTreeSet<Principal>, Option<u64>)> {
        let entry = self.timed("read", self.backend.get(key)).await??;

        match entry {
            None => Ok((BTreeSet::new(), None)),
            Some(entry) => {
                let members = decode(key, &entry.value)?;
                Ok((members, Some(entry.version)))
            }
        }
    }

    async fn timed<T>(&self, operation: &'static str, fut: impl Future<Output = T>) -> RbacResult<T> {
        tokio::time::timeout(self.config.io_timeout, fut)
            .await
            .map_err(|_| RbacError::Timeout {
                operation,
                after: self.config.io_timeout,
            })
    }
}

/// Why one read-modify-write attempt did not land.
#[derive(Debug)]
enum Attempt {
    /// Another writer got there first
    Conflict,
    /// Anything else; not retried
    Failed(RbacError),
}

impl Attempt {
    fn is_conflict(&self) -> bool {
        matches!(self, Attempt::Conflict)
    }
}

fn decode<T: DeserializeOwned>(key: &str, bytes: &[u8]) -> RbacResult<T> {
    serde_json::from_slice(bytes).map_err(|e| RbacError::Corrupt {
        key: key.to_string(),
        reason: e.to_string(),
    })
}
