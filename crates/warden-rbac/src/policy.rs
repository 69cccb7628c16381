//! # Policies
//!
//! A policy names the roles a guarded command requires and whether holding
//! any one of them is enough.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::RoleName;

/// How the roles of a policy combine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PolicyMode {
    /// At least one role is required
    Any,
    /// Every role is required
    All,
}

impl PolicyMode {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyMode::Any => "any",
            PolicyMode::All => "all",
        }
    }

    /// Quantifier used in human readable text ("one" of / "all" of).
    pub fn quantifier(&self) -> &'static str {
        match self {
            PolicyMode::Any => "one",
            PolicyMode::All => "all",
        }
    }
}

/// A role requirement.
///
/// Repeated roles are dropped when the policy is built, keeping the order in
/// which each role first appeared.
///
/// # Example
///
/// ```
/// use warden_rbac::policy::{Policy, PolicyMode};
/// use warden_rbac::types::RoleName;
///
/// let policy = Policy::any([RoleName::root(), RoleName::admin(), RoleName::root()]);
/// assert_eq!(policy.mode(), PolicyMode::Any);
/// assert_eq!(policy.roles().len(), 2);
/// assert_eq!(policy.to_string(), "one of root, admin");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Policy {
    mode: PolicyMode,
    roles: Vec<RoleName>,
}

impl Policy {
    /// Create a policy with the given mode.
    pub fn new(mode: PolicyMode, roles: impl IntoIterator<Item = RoleName>) -> Self {
        let mut unique: Vec<RoleName> = Vec::new();
        for role in roles {
            if !unique.contains(&role) {
                unique.push(role);
            }
        }

        Self {
            mode,
            roles: unique,
        }
    }

    /// Require at least one of `roles`.
    pub fn any(roles: impl IntoIterator<Item = RoleName>) -> Self {
        Self::new(PolicyMode::Any, roles)
    }

    /// Require every one of `roles`.
    pub fn all(roles: impl IntoIterator<Item = RoleName>) -> Self {
        Self::new(PolicyMode::All, roles)
    }

    /// The policy guarding role administration: root or admin.
    pub fn root_or_admin() -> Self {
        Self::any([RoleName::root(), RoleName::admin()])
    }

    /// Get the mode.
    pub fn mode(&self) -> PolicyMode {
        self.mode
    }

    /// Get the required roles, without repeats.
    pub fn roles(&self) -> &[RoleName] {
        &self.roles
    }

    /// Check whether `matches` held roles satisfy this policy.
    ///
    /// An empty ANY policy is never satisfied; an empty ALL policy always is.
    pub fn is_satisfied_by(&self, matches: usize) -> bool {
        match self.mode {
            PolicyMode::Any => matches >= 1,
            PolicyMode::All => matches == self.roles.len(),
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let roles: Vec<&str> = self.roles.iter().map(RoleName::as_str).collect();
        write!(f, "{} of {}", self.mode.quantifier(), roles.join(", "))
    }
}

/// Outcome of evaluating a policy for a principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The principal may proceed
    Allowed,
    /// The principal may not proceed
    Denied {
        /// Required roles the principal does not hold
        missing: Vec<RoleName>,
    },
}

impl Decision {
    /// Check if the decision allows the action.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }
}
