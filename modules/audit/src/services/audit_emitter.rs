//! Mutation-side audit orchestration.
//!
//! `AuditEmitter` is the producer half of the audit pipeline, invoked
//! synchronously from each entity service's create/update/delete method.
//! Per mutation it generates the `event_id`, hands the before/after entity
//! snapshots to the snapshot store, and publishes the event — in that exact
//! order. Both applicable snapshots are stored before the publish call is
//! made, so by the time any consumer observes the event, the data it needs
//! is already retrievable.
//!
//! Auditing is a best-effort side channel relative to the business write:
//! snapshot-store failures and timeouts are logged and swallowed, and by
//! default publish failures are too. The business operation must never fail
//! because auditing is degraded.

use event_bus::{BusError, EventBus, EventEnvelope};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use uuid::Uuid;

use crate::config::Config;
use crate::contracts::{AuditEventType, AuditEventV1};
use crate::snapshot_store::{SnapshotPhase, SnapshotStore};

/// Tuning for the emitter's side-channel behavior.
///
/// Producer processes build this from their [`Config`] so the
/// `SNAPSHOT_OP_TIMEOUT_MS` and `PUBLISH_FAILURE_FATAL` environment knobs
/// reach the emitter.
#[derive(Debug, Clone)]
pub struct EmitterSettings {
    /// Per-operation timeout for snapshot writes. These sit on the request
    /// path, so they must stay sub-second; a timeout is a warning, not a
    /// failure.
    pub snapshot_op_timeout: Duration,

    /// When true, a publish failure is surfaced to the caller instead of
    /// being swallowed. Off by default: auditing is not on the critical
    /// path, and the trade-off is deliberate and documented.
    pub publish_failure_fatal: bool,
}

impl Default for EmitterSettings {
    fn default() -> Self {
        Self {
            snapshot_op_timeout: Duration::from_millis(500),
            publish_failure_fatal: false,
        }
    }
}

impl From<&Config> for EmitterSettings {
    fn from(config: &Config) -> Self {
        Self {
            snapshot_op_timeout: config.snapshot_op_timeout,
            publish_failure_fatal: config.publish_failure_fatal,
        }
    }
}

/// Errors surfaced by the emitter.
///
/// Only publish failures can surface, and only when
/// `publish_failure_fatal` is set.
#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    #[error("failed to publish audit event: {0}")]
    Publish(#[from] BusError),
}

/// Producer-side entry point for the audit pipeline
pub struct AuditEmitter {
    store: Arc<dyn SnapshotStore>,
    bus: Arc<dyn EventBus>,
    settings: EmitterSettings,
}

impl AuditEmitter {
    pub fn new(
        store: Arc<dyn SnapshotStore>,
        bus: Arc<dyn EventBus>,
        settings: EmitterSettings,
    ) -> Self {
        Self {
            store,
            bus,
            settings,
        }
    }

    /// Record a mutation in the audit pipeline.
    ///
    /// Called after the primary persistence operation commits. `before` is
    /// absent for creates, `after` is absent for deletes; both are the
    /// scalar-only snapshot projections from [`crate::contracts`].
    ///
    /// Ordering contract: the before snapshot is stored first, then the
    /// after snapshot, and only then is the event published. Returns the
    /// `event_id` correlating the snapshots with the published event.
    pub async fn emit_mutation_audit<S: Serialize>(
        &self,
        event_type: AuditEventType,
        entity_id: &str,
        actor: Option<&str>,
        before: Option<&S>,
        after: Option<&S>,
    ) -> Result<Uuid, EmitError> {
        let event_id = Uuid::new_v4();

        if let Some(state) = before {
            self.store_snapshot(event_id, SnapshotPhase::Before, state)
                .await;
        }

        if let Some(state) = after {
            self.store_snapshot(event_id, SnapshotPhase::After, state)
                .await;
        }

        let payload = AuditEventV1 {
            entity_type: event_type.entity,
            entity_id: entity_id.to_string(),
            action: event_type.action,
        };

        let envelope = EventEnvelope::with_event_id(event_id, event_type.to_string(), payload)
            .with_actor(actor.map(str::to_string));

        let bytes = match serde_json::to_vec(&envelope) {
            Ok(b) => b,
            Err(e) => {
                // The payload is a closed struct of scalars; this cannot
                // happen in practice, but the side channel still must not
                // take the request down.
                tracing::error!(
                    event_id = %event_id,
                    event_type = %envelope.event_type,
                    error = %e,
                    "Failed to serialize audit envelope, event not published"
                );
                return Ok(event_id);
            }
        };

        match self.bus.publish(&event_type.subject(), bytes).await {
            Ok(()) => {
                tracing::debug!(
                    event_id = %event_id,
                    event_type = %event_type,
                    entity_id = %entity_id,
                    "Audit event published"
                );
                Ok(event_id)
            }
            Err(e) if self.settings.publish_failure_fatal => Err(EmitError::Publish(e)),
            Err(e) => {
                tracing::warn!(
                    event_id = %event_id,
                    event_type = %event_type,
                    entity_id = %entity_id,
                    error = %e,
                    "Audit event publish failed, continuing (best-effort audit)"
                );
                Ok(event_id)
            }
        }
    }

    /// Store one snapshot, bounded by the configured timeout. Failures and
    /// timeouts degrade the audit record for this event, nothing more.
    async fn store_snapshot<S: Serialize>(
        &self,
        event_id: Uuid,
        phase: SnapshotPhase,
        state: &S,
    ) {
        let value: JsonValue = match serde_json::to_value(state) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(
                    event_id = %event_id,
                    phase = %phase,
                    error = %e,
                    "Failed to serialize snapshot, skipping"
                );
                return;
            }
        };

        match timeout(
            self.settings.snapshot_op_timeout,
            self.store.put(event_id, phase, value),
        )
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(
                    event_id = %event_id,
                    phase = %phase,
                    error = %e,
                    "Snapshot store write failed, mutation proceeds without it"
                );
            }
            Err(_) => {
                tracing::warn!(
                    event_id = %event_id,
                    phase = %phase,
                    timeout_ms = self.settings.snapshot_op_timeout.as_millis(),
                    "Snapshot store write timed out, mutation proceeds without it"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emitter_settings_built_from_config() {
        let config = Config {
            database_url: "postgres://localhost/audit".to_string(),
            bus_type: "inmemory".to_string(),
            nats_url: "nats://localhost:4222".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8095,
            snapshot_ttl: Duration::from_secs(600),
            snapshot_op_timeout: Duration::from_millis(250),
            publish_failure_fatal: true,
        };

        let settings = EmitterSettings::from(&config);
        assert_eq!(settings.snapshot_op_timeout, Duration::from_millis(250));
        assert!(settings.publish_failure_fatal);
    }
}
