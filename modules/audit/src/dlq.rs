//! Dead Letter Queue (DLQ) handling
//!
//! Routes events that exhausted their retries (or failed to parse at all)
//! into the `failed_events` table so the subscription never blocks on a
//! single bad message.

use event_bus::BusMessage;
use sqlx::PgPool;
use uuid::Uuid;

use crate::repos::failed_repo;

/// Write a failed event to the DLQ with enough context to debug and replay.
///
/// The envelope is re-parsed as raw JSON so even messages that failed the
/// typed parse can be captured; a missing or unparseable `event_id` is
/// recorded as NULL rather than dropping the row. Only payloads that are
/// not JSON at all cannot be captured (the envelope column is JSONB).
/// Failures here are logged loudly — a DLQ write failure means the event
/// may be lost.
pub async fn handle_processing_error(
    pool: &PgPool,
    msg: &BusMessage,
    error: &str,
    retry_count: i32,
) {
    let envelope: serde_json::Value = match serde_json::from_slice(&msg.payload) {
        Ok(v) => v,
        Err(parse_err) => {
            tracing::error!(
                subject = %msg.subject,
                error = %error,
                parse_error = %parse_err,
                "Failed to process event and could not parse envelope for DLQ"
            );
            return;
        }
    };

    let event_id = envelope
        .get("event_id")
        .and_then(|v| v.as_str())
        .and_then(|s| Uuid::parse_str(s).ok());

    if event_id.is_none() {
        tracing::warn!(
            subject = %msg.subject,
            error = %error,
            "Envelope carries no usable event_id, dead-lettering without one"
        );
    }

    let event_type = envelope
        .get("event_type")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string();

    let write_result = async {
        let mut tx = pool.begin().await?;
        failed_repo::insert(&mut tx, event_id, &msg.subject, envelope, error, retry_count).await?;
        tx.commit().await
    }
    .await;

    match write_result {
        Ok(()) => {
            tracing::error!(
                event_id = ?event_id,
                subject = %msg.subject,
                event_type = %event_type,
                retry_count = retry_count,
                error = %error,
                "Event moved to DLQ after retries exhausted"
            );
        }
        Err(dlq_err) => {
            tracing::error!(
                event_id = ?event_id,
                subject = %msg.subject,
                event_type = %event_type,
                retry_count = retry_count,
                error = %error,
                dlq_error = %dlq_err,
                "Failed to write to DLQ - event may be lost!"
            );
        }
    }
}
