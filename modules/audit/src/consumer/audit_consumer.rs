//! Audit Event Consumer
//!
//! Subscribes to every workforce event (`workforce.events.>`) and merges
//! each one with its snapshots into a durable audit record.
//!
//! Per message: `Received → (duplicate? → skip) → snapshots fetched →
//! persisted → done`. Malformed messages go straight to the DLQ without
//! retries; transient infrastructure failures get bounded retries with
//! backoff, then the DLQ. The loop itself never panics on a bad message.

use event_bus::consumer_retry::{retry_with_backoff_if, RetryConfig};
use event_bus::{validate_envelope_fields, BusMessage, EventBus, EventEnvelope};
use futures::StreamExt;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::Instrument;

use crate::contracts::{AuditEventType, AuditEventV1};
use crate::services::audit_merge_service::{process_audit_event, AuditMergeError};
use crate::snapshot_store::SnapshotStore;
use crate::validation::validate_audit_event;

/// Start the audit consumer task.
///
/// Spawns a background task that:
/// 1. Subscribes to the wildcard subject covering all audit event types
/// 2. Validates and parses each envelope
/// 3. Merges event + snapshots into the audit store, idempotently
/// 4. Routes failures to the DLQ (immediately for malformed payloads,
///    after retries for transient errors)
pub async fn start_audit_consumer(
    bus: Arc<dyn EventBus>,
    pool: PgPool,
    store: Arc<dyn SnapshotStore>,
) {
    tokio::spawn(async move {
        tracing::info!("Starting audit consumer");

        let subject = AuditEventType::WILDCARD_SUBJECT;
        let mut stream = match bus.subscribe(subject).await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("Failed to subscribe to {}: {}", subject, e);
                return;
            }
        };

        tracing::info!("Subscribed to {}", subject);

        let retry_config = RetryConfig::default();

        while let Some(msg) = stream.next().await {
            handle_message(&pool, store.as_ref(), &msg, &retry_config).await;
        }

        tracing::warn!("Audit consumer stopped");
    });
}

/// Handle one bus message end to end. Never returns an error: every failure
/// path terminates in a log line and, where possible, a DLQ row.
async fn handle_message(
    pool: &PgPool,
    store: &dyn SnapshotStore,
    msg: &BusMessage,
    retry_config: &RetryConfig,
) {
    // Parse and validate the envelope before anything else; a message that
    // fails here will fail identically on every retry.
    let envelope = match parse_envelope(msg) {
        Ok(env) => env,
        Err(reason) => {
            tracing::error!(
                subject = %msg.subject,
                error = %reason,
                "Malformed audit event, routing to DLQ without retry"
            );
            crate::dlq::handle_processing_error(pool, msg, &reason, 0).await;
            return;
        }
    };

    let span = tracing::info_span!(
        "process_audit_event",
        event_id = %envelope.event_id,
        subject = %msg.subject,
        event_type = %envelope.event_type,
        actor = %envelope.actor.as_deref().unwrap_or("System")
    );

    async {
        let result = retry_with_backoff_if(
            || async {
                match process_audit_event(pool, store, &envelope).await {
                    Ok(_) => Ok(()),
                    Err(AuditMergeError::DuplicateEvent(event_id)) => {
                        // Redelivery is expected under at-least-once
                        tracing::info!(
                            event_id = %event_id,
                            "Duplicate event ignored (already recorded)"
                        );
                        Ok(())
                    }
                    Err(e) => Err(e),
                }
            },
            retry_config,
            "audit_consumer",
            AuditMergeError::is_retriable,
        )
        .await;

        if let Err(e) = result {
            let attempts = if e.is_retriable() {
                retry_config.max_attempts as i32
            } else {
                1
            };
            tracing::error!(
                error = %e,
                retry_count = attempts,
                "Event processing failed, sending to DLQ"
            );
            crate::dlq::handle_processing_error(pool, msg, &e.to_string(), attempts).await;
        }
    }
    .instrument(span)
    .await;
}

/// Parse a bus message into a typed envelope, or explain why it cannot be
/// processed at all.
fn parse_envelope(msg: &BusMessage) -> Result<EventEnvelope<AuditEventV1>, String> {
    let raw: serde_json::Value = serde_json::from_slice(&msg.payload)
        .map_err(|e| format!("envelope is not valid JSON: {e}"))?;

    validate_envelope_fields(&raw)?;

    let envelope: EventEnvelope<AuditEventV1> =
        serde_json::from_value(raw).map_err(|e| format!("failed to parse payload: {e}"))?;

    // Deterministic payload checks belong here too: retrying them is wasted
    // work, the DLQ is the only destination.
    validate_audit_event(&envelope.payload).map_err(|e| e.to_string())?;

    Ok(envelope)
}
