//! # Warden Store
//!
//! This crate provides the shared key-value storage contract used by warden
//! to persist role assignments.
//!
//! ## Overview
//!
//! The warden-store crate handles:
//! - **Store Contract**: Async `get` / `set` over process-wide shared keys
//! - **Versioned Entries**: Every write bumps a per-key version
//! - **Conditional Writes**: `compare_and_set` for optimistic concurrency
//!
//! ## Features
//!
//! - `memory` (default): In-memory store for single-process bots and tests
//! - `redis`: Redis-backed store shared by every bot instance
//!
//! ## Usage
//!
//! ```rust,no_run
//! use warden_store::{CasOutcome, KeyValueStore, MemoryStore};
//!
//! async fn example() {
//!     let store = MemoryStore::new();
//!
//!     // First write must expect an absent key
//!     let outcome = store
//!         .compare_and_set("rbac:role:admin", None, b"[\"U2\"]".to_vec())
//!         .await
//!         .unwrap();
//!     assert_eq!(outcome, CasOutcome::Applied { version: 1 });
//!
//!     // A stale version is rejected instead of overwriting
//!     let outcome = store
//!         .compare_and_set("rbac:role:admin", None, b"[]".to_vec())
//!         .await
//!         .unwrap();
//!     assert!(!outcome.is_applied());
//! }
//! ```
//!
//! ## Versioning
//!
//! Versions start at 1 on the first write of a key and increase by one on
//! every successful write. An absent key has no version; conditional writes
//! pass `None` to require absence.

pub mod store;

#[cfg(feature = "redis")]
pub mod redis;

// Re-export main types
pub use store::{CasOutcome, Entry, KeyValueStore, MemoryStore, StoreError, StoreResult, StoreStats};

#[cfg(feature = "redis")]
pub use crate::redis::{RedisStore, RedisStoreConfig};
