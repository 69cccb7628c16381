//! Store contract and in-memory implementation
//!
//! This module provides the key-value storage abstraction that role
//! assignments are persisted through, plus an in-memory backend.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// Store error types.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Could not reach the backend
    #[error("Connection error: {0}")]
    Connection(String),

    /// Backend rejected or failed the command
    #[error("Backend error: {0}")]
    Backend(String),

    /// Stored bytes could not be read back
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// A stored value together with its write version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Raw stored bytes
    pub value: Vec<u8>,
    /// Version of the write that produced `value` (starts at 1)
    pub version: u64,
}

/// Result of a conditional write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    /// The write landed and produced `version`.
    Applied {
        /// New version of the key
        version: u64,
    },
    /// The key changed since it was read; nothing was written.
    Conflict {
        /// Version currently stored, `None` if the key is absent
        current: Option<u64>,
    },
}

impl CasOutcome {
    /// Check whether the write landed.
    pub fn is_applied(&self) -> bool {
        matches!(self, CasOutcome::Applied { .. })
    }
}

/// Shared key-value store trait.
///
/// Keys are visible process-wide (and, for networked backends, to every
/// instance sharing the backend).
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a key. An absent key is `Ok(None)`.
    async fn get(&self, key: &str) -> StoreResult<Option<Entry>>;

    /// Write a key unconditionally, returning the new version.
    async fn set(&self, key: &str, value: Vec<u8>) -> StoreResult<u64>;

    /// Write a key only if its current version equals `expected`.
    ///
    /// `expected = None` requires the key to be absent.
    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<u64>,
        value: Vec<u8>,
    ) -> StoreResult<CasOutcome>;

    /// Get store statistics.
    async fn stats(&self) -> StoreStats;
}

/// Store statistics.
#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    /// Total reads
    pub reads: u64,
    /// Total successful writes
    pub writes: u64,
    /// Conditional writes rejected on a version mismatch
    pub conflicts: u64,
}

/// In-memory store implementation.
///
/// This is suitable for single-process bots and testing.
/// Clones share the same underlying map.
#[derive(Clone)]
pub struct MemoryStore {
    /// Stored entries
    entries: Arc<RwLock<HashMap<String, Entry>>>,
    /// Statistics
    stats: Arc<RwLock<StoreStats>>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore").finish_non_exhaustive()
    }
}

impl MemoryStore {
    /// Create a new, empty in-memory store.
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            stats: Arc::new(RwLock::new(StoreStats::default())),
        }
    }

    /// Number of keys currently stored.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Check if no key has been written yet.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Entry>> {
        let entry = self.entries.read().await.get(key).cloned();

        {
            let mut stats = self.stats.write().await;
            stats.reads += 1;
        }

        Ok(entry)
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> StoreResult<u64> {
        let version = {
            let mut entries = self.entries.write().await;
            let version = entries.get(key).map_or(1, |e| e.version + 1);
            entries.insert(key.to_string(), Entry { value, version });
            version
        };

        {
            let mut stats = self.stats.write().await;
            stats.writes += 1;
        }

        tracing::trace!(key = %key, version, "Stored key");

        Ok(version)
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<u64>,
        value: Vec<u8>,
    ) -> StoreResult<CasOutcome> {
        // Version check and write happen under one write guard
        let outcome = {
            let mut entries = self.entries.write().await;
            let current = entries.get(key).map(|e| e.version);

            if current != expected {
                CasOutcome::Conflict { current }
            } else {
                let version = current.map_or(1, |v| v + 1);
                entries.insert(key.to_string(), Entry { value, version });
                CasOutcome::Applied { version }
            }
        };

        {
            let mut stats = self.stats.write().await;
            match outcome {
                CasOutcome::Applied { .. } => stats.writes += 1,
                CasOutcome::Conflict { .. } => stats.conflicts += 1,
            }
        }

        Ok(outcome)
    }

    async fn stats(&self) -> StoreStats {
        self.stats.read().await.clone()
    }
}
