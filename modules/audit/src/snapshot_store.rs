//! Snapshot Store
//!
//! Short-lived keyed cache carrying serialized entity state between the
//! mutation path and the audit merger. Entries are keyed by
//! `audit:{event_id}:{phase}` and expire after a bounded TTL, so memory
//! stays bounded even if the consumer is down and never reads them.
//!
//! Keys are unique per `event_id` + phase, so concurrent producers never
//! contend on a key. A missing entry at read time is a degraded-but-valid
//! outcome for the consumer, never an error.

use async_trait::async_trait;
use moka::future::Cache;
use serde_json::Value as JsonValue;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Which side of the mutation a snapshot captures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotPhase {
    Before,
    After,
}

impl SnapshotPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::After => "after",
        }
    }
}

impl fmt::Display for SnapshotPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Cache key for one snapshot: `audit:{event_id}:{phase}`
pub fn snapshot_key(event_id: Uuid, phase: SnapshotPhase) -> String {
    format!("audit:{event_id}:{phase}")
}

/// Errors from snapshot store operations.
///
/// The in-process store cannot fail, but the trait seam allows external
/// key-value backends where unreachability is a real outcome.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotStoreError {
    #[error("snapshot store backend error: {0}")]
    Backend(String),
}

/// Keyed, TTL-expiring store for entity snapshots.
///
/// The mutation orchestrator is the sole writer; the audit merger is the
/// sole reader. Both treat the store as best-effort relative to their own
/// primary operation.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn put(
        &self,
        event_id: Uuid,
        phase: SnapshotPhase,
        state: JsonValue,
    ) -> Result<(), SnapshotStoreError>;

    async fn get(
        &self,
        event_id: Uuid,
        phase: SnapshotPhase,
    ) -> Result<Option<JsonValue>, SnapshotStoreError>;

    async fn delete(&self, event_id: Uuid, phase: SnapshotPhase)
        -> Result<(), SnapshotStoreError>;
}

/// In-process snapshot store backed by a moka TTL cache.
#[derive(Clone)]
pub struct MokaSnapshotStore {
    cache: Cache<String, JsonValue>,
}

impl MokaSnapshotStore {
    /// Create a store whose entries expire `ttl` after being written.
    pub fn new(ttl: Duration, max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .time_to_live(ttl)
            .max_capacity(max_capacity)
            .build();

        Self { cache }
    }

    /// Defaults matching the documented contract: 1 hour TTL.
    pub fn with_default_ttl() -> Self {
        Self::new(Duration::from_secs(3600), 100_000)
    }
}

#[async_trait]
impl SnapshotStore for MokaSnapshotStore {
    async fn put(
        &self,
        event_id: Uuid,
        phase: SnapshotPhase,
        state: JsonValue,
    ) -> Result<(), SnapshotStoreError> {
        self.cache.insert(snapshot_key(event_id, phase), state).await;
        Ok(())
    }

    async fn get(
        &self,
        event_id: Uuid,
        phase: SnapshotPhase,
    ) -> Result<Option<JsonValue>, SnapshotStoreError> {
        Ok(self.cache.get(&snapshot_key(event_id, phase)).await)
    }

    async fn delete(
        &self,
        event_id: Uuid,
        phase: SnapshotPhase,
    ) -> Result<(), SnapshotStoreError> {
        self.cache.invalidate(&snapshot_key(event_id, phase)).await;
        Ok(())
    }
}
