//! Repository for the durable audit store.
//!
//! `audit_records` is append-only: this module exposes insert-if-absent and
//! existence checks, nothing else. The unique index on `event_id` is the
//! authoritative de-duplication mechanism for concurrent consumers.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// A persisted, immutable audit record
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AuditRecord {
    pub id: Uuid,
    pub event_id: Uuid,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub actor: String,
    pub occurred_at: DateTime<Utc>,
    pub before_state: Option<JsonValue>,
    pub after_state: Option<JsonValue>,
    /// True when an expected snapshot had expired before consumption
    pub incomplete: bool,
    pub recorded_at: DateTime<Utc>,
}

/// Check whether an audit record already exists for this event (idempotency check)
pub async fn exists(pool: &PgPool, event_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM audit_records WHERE event_id = $1)",
    )
    .bind(event_id)
    .fetch_one(pool)
    .await?;

    Ok(result)
}

/// Insert an audit record if none exists for this `event_id`.
///
/// Returns `true` when a row was inserted, `false` when another delivery of
/// the same event already created one. `ON CONFLICT DO NOTHING` on the
/// unique `event_id` index makes concurrent duplicate processing safe
/// without locks.
pub async fn insert_if_absent(
    pool: &PgPool,
    id: Uuid,
    event_id: Uuid,
    event_type: &str,
    entity_type: &str,
    entity_id: &str,
    actor: &str,
    occurred_at: DateTime<Utc>,
    before_state: Option<&JsonValue>,
    after_state: Option<&JsonValue>,
    incomplete: bool,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO audit_records
            (id, event_id, event_type, entity_type, entity_id, actor,
             occurred_at, before_state, after_state, incomplete)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (event_id) DO NOTHING
        "#,
    )
    .bind(id)
    .bind(event_id)
    .bind(event_type)
    .bind(entity_type)
    .bind(entity_id)
    .bind(actor)
    .bind(occurred_at)
    .bind(before_state)
    .bind(after_state)
    .bind(incomplete)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}
