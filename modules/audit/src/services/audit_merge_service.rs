//! Audit merge business logic.
//!
//! Reconciles a received event with its snapshots into one durable audit
//! record, idempotently: for any `event_id` at most one record is ever
//! created, no matter how many times the broker redelivers the message.

use event_bus::EventEnvelope;
use sqlx::PgPool;
use uuid::Uuid;

use crate::contracts::AuditEventV1;
use crate::repos::audit_repo;
use crate::snapshot_store::{SnapshotPhase, SnapshotStore, SnapshotStoreError};
use crate::validation::{validate_audit_event, ValidationError};

/// Errors that can occur while merging an audit event
#[derive(Debug, thiserror::Error)]
pub enum AuditMergeError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Snapshot store error: {0}")]
    SnapshotStore(#[from] SnapshotStoreError),

    #[error("Event already processed (duplicate): {0}")]
    DuplicateEvent(Uuid),
}

impl AuditMergeError {
    /// Whether the consumer should retry this failure. Validation failures
    /// and duplicates never change on retry; infrastructure errors might.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Database(_) | Self::SnapshotStore(_))
    }
}

/// Result type for merge operations
pub type AuditMergeResult<T> = Result<T, AuditMergeError>;

/// Merge one received event into the audit store.
///
/// 1. Idempotency check against the audit store
/// 2. Payload validation
/// 3. Snapshot retrieval by `event_id` (either phase may be absent)
/// 4. Insert-if-absent on the unique `event_id` index
/// 5. Best-effort cleanup of the consumed snapshot keys
///
/// Entity identity comes from the event payload, never from parsing the
/// snapshots. A missing expected snapshot degrades the record
/// (`incomplete = true`) with a warning; the event is never dropped.
pub async fn process_audit_event(
    pool: &PgPool,
    store: &dyn SnapshotStore,
    envelope: &EventEnvelope<AuditEventV1>,
) -> AuditMergeResult<Uuid> {
    let event_id = envelope.event_id;
    let payload = &envelope.payload;

    // Cheap pre-check; the unique index below is the authoritative guard
    if audit_repo::exists(pool, event_id).await? {
        return Err(AuditMergeError::DuplicateEvent(event_id));
    }

    validate_audit_event(payload)?;

    let before_state = store.get(event_id, SnapshotPhase::Before).await?;
    let after_state = store.get(event_id, SnapshotPhase::After).await?;

    let missing_before = payload.action.expects_before() && before_state.is_none();
    let missing_after = payload.action.expects_after() && after_state.is_none();
    let incomplete = missing_before || missing_after;

    if incomplete {
        tracing::warn!(
            event_id = %event_id,
            event_type = %payload.event_type(),
            entity_id = %payload.entity_id,
            missing_before,
            missing_after,
            "Snapshot expired before consumption, persisting partial audit record"
        );
    }

    let event_type = payload.event_type();
    let actor = envelope.actor.as_deref().unwrap_or("System");
    let record_id = Uuid::new_v4();

    let inserted = audit_repo::insert_if_absent(
        pool,
        record_id,
        event_id,
        &event_type.to_string(),
        event_type.entity.as_str(),
        &payload.entity_id,
        actor,
        envelope.occurred_at,
        before_state.as_ref(),
        after_state.as_ref(),
        incomplete,
    )
    .await?;

    if !inserted {
        // A concurrent consumer won the insert race; same outcome as the
        // pre-check catching it.
        return Err(AuditMergeError::DuplicateEvent(event_id));
    }

    // Cleanup is optional: TTL expiry covers keys we fail to delete
    store.delete(event_id, SnapshotPhase::Before).await.ok();
    store.delete(event_id, SnapshotPhase::After).await.ok();

    tracing::info!(
        event_id = %event_id,
        record_id = %record_id,
        event_type = %event_type,
        entity_id = %payload.entity_id,
        incomplete,
        "Audit record created"
    );

    Ok(record_id)
}
