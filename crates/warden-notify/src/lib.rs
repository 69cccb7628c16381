//! # Warden Notify
//!
//! This crate alerts administrators when a guarded command is denied.
//!
//! ## Overview
//!
//! The warden-notify crate handles:
//! - **Notifier Contract**: Best-effort direct messages to one principal
//! - **Alerts**: Title, body and color of an out-of-band warning
//! - **Admin Notifier**: Fan-out of one alert to every root and admin
//!
//! ## Features
//!
//! - `memory` (default): In-process notifier that records deliveries
//! - `redis`: Publishes alerts on per-principal Redis channels
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use warden_notify::{AdminNotifier, DenialContext, MemoryNotifier};
//! use warden_rbac::{Policy, Principal, RoleStore};
//! use warden_store::MemoryStore;
//!
//! async fn example() -> warden_rbac::RbacResult<()> {
//!     let store = RoleStore::new(Arc::new(MemoryStore::new()), Principal::new("U1")?);
//!     let transport = MemoryNotifier::new();
//!     let admins = AdminNotifier::new(store, Arc::new(transport.clone()));
//!
//!     let context = DenialContext::new(
//!         Principal::new("U5")?,
//!         "who has role admin",
//!         Policy::root_or_admin(),
//!     );
//!     let report = admins.notify_denied(&context).await;
//!     assert_eq!(report.delivered.len(), 1);
//!     Ok(())
//! }
//! ```
//!
//! ## Delivery Semantics
//!
//! Every denial produces exactly one alert per principal in `root ∪ admin`
//! at the time of the denial. Deliveries are not batched, deduplicated or
//! rate limited. Deliveries to different recipients run concurrently. A failed
//! or timed out delivery is logged and reported but never changes the denial
//! itself.

pub mod admin;
pub mod notifier;

#[cfg(feature = "redis")]
pub mod redis;

// Re-export main types
pub use admin::{
    AdminNotifier, DenialContext, FailedDelivery, NotificationReport, PendingAlerts, DENIAL_TITLE,
};
pub use notifier::{Alert, Delivery, MemoryNotifier, Notifier, NotifyError, NotifyResult};

#[cfg(feature = "redis")]
pub use crate::redis::{RedisNotifier, RedisNotifierConfig};
