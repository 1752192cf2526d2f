//! # Event Envelope
//!
//! The wire contract for every event published across the audit pipeline.
//!
//! The envelope is deliberately minimal: a correlation id, a type tag, a
//! timestamp, a best-effort actor, and a typed payload carrying only
//! identifying fields. Entity state never travels on the bus — it is handed
//! off through the snapshot store, keyed by `event_id`.
//!
//! `event_id` is generated once per logical mutation and reused for every
//! snapshot write and the final publish; it is the sole correlation key
//! between the snapshot store, the bus, and the audit store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Standard envelope wrapping every published event.
///
/// # Type Parameter
///
/// * `T` - The event-specific payload type
///
/// # Examples
///
/// ```rust
/// use event_bus::EventEnvelope;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Serialize, Deserialize)]
/// struct EmployeeCreated {
///     entity_id: String,
/// }
///
/// let envelope = EventEnvelope::new(
///     "EmployeeCreated",
///     EmployeeCreated { entity_id: "emp-1".to_string() },
/// )
/// .with_actor(Some("jane.doe".to_string()));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope<T> {
    /// Unique event identifier (idempotency and correlation key)
    pub event_id: Uuid,

    /// Event type tag, e.g. "EmployeeUpdated"
    pub event_type: String,

    /// UTC timestamp when the event was generated
    pub occurred_at: DateTime<Utc>,

    /// Who performed the mutation; consumers fall back to "System"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,

    /// Event-specific payload (identifying fields only, never full state)
    pub payload: T,
}

impl<T> EventEnvelope<T> {
    /// Create a new envelope with an auto-generated `event_id` and
    /// `occurred_at` set to now.
    pub fn new(event_type: impl Into<String>, payload: T) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type: event_type.into(),
            occurred_at: Utc::now(),
            actor: None,
            payload,
        }
    }

    /// Create an envelope with an explicit `event_id`.
    ///
    /// The producer generates the id before writing snapshots, so the
    /// envelope must be built around an id that already exists in the
    /// snapshot store.
    pub fn with_event_id(event_id: Uuid, event_type: impl Into<String>, payload: T) -> Self {
        Self {
            event_id,
            event_type: event_type.into(),
            occurred_at: Utc::now(),
            actor: None,
            payload,
        }
    }

    /// Set the acting user
    pub fn with_actor(mut self, actor: Option<String>) -> Self {
        self.actor = actor;
        self
    }
}

/// Validate the envelope fields of a raw JSON message.
///
/// Used by consumers before committing to a typed parse, so malformed
/// messages can be rejected with a precise reason.
///
/// # Validation Rules
///
/// - `event_id`: present, parseable as a UUID
/// - `event_type`: present, non-empty
/// - `occurred_at`: present
///
/// # Errors
///
/// Returns a descriptive error string if validation fails.
pub fn validate_envelope_fields(envelope: &serde_json::Value) -> Result<(), String> {
    let event_id = envelope
        .get("event_id")
        .and_then(|v| v.as_str())
        .ok_or("Missing or invalid event_id")?;

    Uuid::parse_str(event_id).map_err(|_| format!("event_id is not a UUID: {event_id}"))?;

    let event_type = envelope
        .get("event_type")
        .and_then(|v| v.as_str())
        .ok_or("Missing or invalid event_type")?;

    if event_type.is_empty() {
        return Err("event_type cannot be empty".to_string());
    }

    envelope
        .get("occurred_at")
        .and_then(|v| v.as_str())
        .ok_or("Missing or invalid occurred_at")?;

    Ok(())
}
