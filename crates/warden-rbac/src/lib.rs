//! # Warden RBAC (Role-Based Access Control)
//!
//! This crate provides role assignments and authorization decisions for
//! chat commands guarded by warden.
//!
//! ## Overview
//!
//! The warden-rbac crate handles:
//! - **Roles**: Validated role names, including the reserved `root` role
//! - **Principals**: Opaque user ids acting on the bot
//! - **Role Store**: Role to member-set assignments in shared storage
//! - **Policies**: ANY / ALL role requirements and their evaluation
//!
//! ## Architecture
//!
//! ```text
//! Policy = Mode (any | all) + Roles
//!
//! Storage layout:
//!   "rbac:role:admin"   -> ["U2","U3"]
//!   "rbac:role:deploy"  -> ["U7"]
//!   root                -> never stored, always the configured principal
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use warden_rbac::{AuthorizationEngine, Policy, Principal, RoleName, RoleStore};
//! use warden_store::MemoryStore;
//!
//! async fn example() -> warden_rbac::RbacResult<()> {
//!     let root = Principal::new("U1")?;
//!     let store = RoleStore::new(Arc::new(MemoryStore::new()), root.clone());
//!
//!     store.grant(&RoleName::admin(), &Principal::new("U2")?).await?;
//!
//!     let engine = AuthorizationEngine::new(store);
//!     let policy = Policy::any([RoleName::root(), RoleName::admin()]);
//!     assert!(engine.authorize(&Principal::new("U2")?, &policy).await?.is_allowed());
//!     Ok(())
//! }
//! ```
//!
//! ## Concurrency
//!
//! Grants and revokes are read-modify-write over a whole member set. Each
//! write is conditional on the version that was read; on a version conflict
//! the store re-reads and re-applies the change with exponential backoff, so
//! concurrent mutations of one role never drop an update.

pub mod engine;
pub mod error;
pub mod policy;
pub mod retry;
pub mod store;
pub mod types;

// Re-export main types for convenience
pub use engine::AuthorizationEngine;
pub use error::{RbacError, RbacResult};
pub use policy::{Decision, Policy, PolicyMode};
pub use retry::{with_retry, RetryConfig};
pub use store::{GrantOutcome, RevokeOutcome, RoleSource, RoleStore, RoleStoreConfig};
pub use types::{Principal, RoleName};
