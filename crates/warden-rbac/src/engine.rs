//! # Authorization engine
//!
//! Evaluates ANY / ALL policies against current role membership.

use crate::error::{RbacError, RbacResult};
use crate::policy::{Decision, Policy, PolicyMode};
use crate::store::RoleStore;
use crate::types::{Principal, RoleName};

/// Policy evaluator backed by a [`RoleStore`].
///
/// Membership is read fresh on every check.
#[derive(Debug, Clone)]
pub struct AuthorizationEngine {
    store: RoleStore,
}

impl AuthorizationEngine {
    /// Create an engine over `store`.
    pub fn new(store: RoleStore) -> Self {
        Self { store }
    }

    /// Get the underlying role store.
    pub fn store(&self) -> &RoleStore {
        &self.store
    }

    /// Count how many of `roles` the principal holds.
    ///
    /// Each entry is looked up on its own, so a role listed twice counts
    /// twice. Policies remove repeats before counting.
    pub async fn count_matches(&self, principal: &Principal, roles: &[RoleName]) -> RbacResult<usize> {
        let mut matches = 0;
        for role in roles {
            if self.store.has_role(role, principal).await? {
                matches += 1;
            }
        }
        Ok(matches)
    }

    /// Check if the principal holds at least one of `roles`.
    pub async fn authorize_any(&self, principal: &Principal, roles: &[RoleName]) -> RbacResult<bool> {
        let policy = Policy::any(roles.iter().cloned());
        Ok(self.authorize(principal, &policy).await?.is_allowed())
    }

    /// Check if the principal holds every one of `roles`.
    pub async fn authorize_all(&self, principal: &Principal, roles: &[RoleName]) -> RbacResult<bool> {
        let policy = Policy::all(roles.iter().cloned());
        Ok(self.authorize(principal, &policy).await?.is_allowed())
    }

    /// Evaluate `policy` for `principal`.
    ///
    /// ANY policies stop at the first held role. ALL policies check every
    /// role so a denial reports everything that is missing.
    pub async fn authorize(&self, principal: &Principal, policy: &Policy) -> RbacResult<Decision> {
        let mut missing = Vec::new();
        let mut matches = 0;

        for role in policy.roles() {
            if self.store.has_role(role, principal).await? {
                matches += 1;
                if policy.mode() == PolicyMode::Any {
                    break;
                }
            } else {
                missing.push(role.clone());
            }
        }

        let decision = if policy.is_satisfied_by(matches) {
            Decision::Allowed
        } else {
            Decision::Denied { missing }
        };

        match decision {
            Decision::Allowed => {
                tracing::debug!(principal = %principal, policy = %policy, "Authorization granted");
            }
            Decision::Denied { .. } => {
                tracing::info!(principal = %principal, policy = %policy, "Authorization denied");
            }
        }

        Ok(decision)
    }

    /// Like [`authorize`](Self::authorize), but a denial is an error.
    ///
    /// # Errors
    ///
    /// `RbacError::Unauthorized` when the policy is not satisfied.
    pub async fn require(&self, principal: &Principal, policy: &Policy) -> RbacResult<()> {
        match self.authorize(principal, policy).await? {
            Decision::Allowed => Ok(()),
            Decision::Denied { .. } => Err(RbacError::Unauthorized {
                principal: principal.to_string(),
                requirement: policy.to_string(),
            }),
        }
    }
}
