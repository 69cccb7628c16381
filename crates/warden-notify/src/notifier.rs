//! Notifier contract and in-memory implementation
//!
//! This module provides the direct-message abstraction alerts are sent
//! through, and a memory backend that records every delivery.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;
use warden_rbac::Principal;

/// Notifier error types.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Transport refused or failed the message
    #[error("Failed to deliver alert: {0}")]
    Delivery(String),

    /// Transport did not answer in time
    #[error("Delivery timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Alert could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for notifier operations.
pub type NotifyResult<T> = Result<T, NotifyError>;

/// An out-of-band warning sent to one principal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Alert {
    /// Unique alert id, shared by every copy of one fan-out
    pub id: Uuid,
    /// Short headline
    pub title: String,
    /// Message text (chat markup allowed)
    pub body: String,
    /// Attachment color, e.g. `#ff0000`
    pub color: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl Alert {
    /// Default color of warning alerts.
    pub const WARNING_COLOR: &'static str = "#ff0000";

    /// Create a warning alert.
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            title: title.into(),
            body: body.into(),
            color: Self::WARNING_COLOR.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// Direct-message transport trait.
///
/// Delivery is best effort and may fail independently per target.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send `alert` to `principal` only.
    async fn send_direct(&self, principal: &Principal, alert: &Alert) -> NotifyResult<()>;
}

/// A recorded delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Recipient
    pub principal: Principal,
    /// Alert sent
    pub alert: Alert,
}

/// In-memory notifier.
///
/// Records deliveries and can be told to fail for chosen recipients. Clones
/// share state.
#[derive(Clone)]
pub struct MemoryNotifier {
    /// Delivered alerts, oldest first
    sent: Arc<RwLock<Vec<Delivery>>>,
    /// Recipients whose deliveries fail
    failing: Arc<RwLock<HashSet<Principal>>>,
}

impl std::fmt::Debug for MemoryNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryNotifier").finish_non_exhaustive()
    }
}

impl MemoryNotifier {
    /// Create a new in-memory notifier.
    pub fn new() -> Self {
        Self {
            sent: Arc::new(RwLock::new(Vec::new())),
            failing: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    /// Make every delivery to `principal` fail.
    pub async fn fail_for(&self, principal: Principal) {
        self.failing.write().await.insert(principal);
    }

    /// All deliveries so far.
    pub async fn sent(&self) -> Vec<Delivery> {
        self.sent.read().await.clone()
    }

    /// Deliveries addressed to `principal`.
    pub async fn sent_to(&self, principal: &Principal) -> Vec<Alert> {
        self.sent
            .read()
            .await
            .iter()
            .filter(|d| &d.principal == principal)
            .map(|d| d.alert.clone())
            .collect()
    }
}

impl Default for MemoryNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn send_direct(&self, principal: &Principal, alert: &Alert) -> NotifyResult<()> {
        if self.failing.read().await.contains(principal) {
            return Err(NotifyError::Delivery(format!(
                "recipient {} is unreachable",
                principal
            )));
        }

        self.sent.write().await.push(Delivery {
            principal: principal.clone(),
            alert: alert.clone(),
        });

        Ok(())
    }
}
