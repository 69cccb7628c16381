//! Error types for role assignment and authorization
//!
//! This module defines all error types that can occur while resolving,
//! mutating, or checking role membership.

use std::time::Duration;
use thiserror::Error;
use warden_store::StoreError;

/// RBAC error types.
#[derive(Debug, Error)]
pub enum RbacError {
    /// Principal does not satisfy the required policy
    #[error("Unauthorized: {principal} lacks {requirement}")]
    Unauthorized {
        /// Principal that was checked
        principal: String,
        /// Human readable policy, e.g. "one of root, admin"
        requirement: String,
    },

    /// Attempt to grant or revoke a statically configured role
    #[error("Role '{0}' can only be changed via static configuration")]
    ReservedRoleViolation(String),

    /// Role name outside the allowed identifier grammar
    #[error("Invalid role name: {0}")]
    InvalidRoleName(String),

    /// Principal id that cannot be a user id
    #[error("Invalid principal: {0}")]
    InvalidPrincipal(String),

    /// Storage backend failed
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// Stored assignment could not be decoded
    #[error("Corrupt role assignment at '{key}': {reason}")]
    Corrupt {
        /// Storage key
        key: String,
        /// Decoder message
        reason: String,
    },

    /// Conditional writes kept losing to concurrent writers
    #[error("Role '{role}' changed concurrently {attempts} times, giving up")]
    Conflict {
        /// Role being mutated
        role: String,
        /// Attempts made
        attempts: u32,
    },

    /// Storage call exceeded its time budget
    #[error("Storage {operation} timed out after {after:?}")]
    Timeout {
        /// Operation that timed out ("read" or "write")
        operation: &'static str,
        /// Configured budget
        after: Duration,
    },
}

/// Result type for RBAC operations.
pub type RbacResult<T> = Result<T, RbacError>;

impl RbacError {
    /// Check if this error is an infrastructure failure.
    ///
    /// User errors (bad role name, reserved role, unauthorized) are expected
    /// and should not be logged at error level.
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            RbacError::Storage(_)
                | RbacError::Corrupt { .. }
                | RbacError::Conflict { .. }
                | RbacError::Timeout { .. }
        )
    }
}
