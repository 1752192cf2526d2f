//! Repository for audit query operations.
//!
//! Read-only, bounded lookups over `audit_records`. No mutation entry
//! points exist here; the audit store is append-only by contract.
//! All queries are designed to hit the entity / event-type / occurred_at
//! indexes and return newest-first.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use thiserror::Error;

use crate::repos::audit_repo::AuditRecord;

const MAX_QUERY_LIMIT: i64 = 500;

/// Errors that can occur during audit query operations
#[derive(Debug, Error)]
pub enum AuditQueryError {
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Invalid limit: {limit} (must be 1..={MAX_QUERY_LIMIT})")]
    InvalidLimit { limit: i64 },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Filter for the general audit log query; every field is optional except
/// the limit.
#[derive(Debug, Clone, Default)]
pub struct AuditLogFilter {
    pub entity_type: Option<String>,
    pub event_type: Option<String>,
    pub entity_id: Option<String>,
    pub occurred_from: Option<DateTime<Utc>>,
    pub occurred_to: Option<DateTime<Utc>>,
    pub limit: i64,
}

fn validate_limit(limit: i64) -> Result<(), AuditQueryError> {
    if limit <= 0 || limit > MAX_QUERY_LIMIT {
        return Err(AuditQueryError::InvalidLimit { limit });
    }
    Ok(())
}

/// Query audit records matching an arbitrary filter combination.
///
/// Results are ordered by `occurred_at` DESC. Absent filter fields match
/// everything; `before_state`/`after_state` come back nullable and callers
/// must tolerate either being absent.
pub async fn query_audit_logs(
    pool: &PgPool,
    filter: &AuditLogFilter,
) -> Result<Vec<AuditRecord>, AuditQueryError> {
    validate_limit(filter.limit)?;

    if let (Some(from), Some(to)) = (filter.occurred_from, filter.occurred_to) {
        if from > to {
            return Err(AuditQueryError::InvalidDateRange {
                start: from,
                end: to,
            });
        }
    }

    let records = sqlx::query_as::<_, AuditRecord>(
        r#"
        SELECT id, event_id, event_type, entity_type, entity_id, actor,
               occurred_at, before_state, after_state, incomplete, recorded_at
        FROM audit_records
        WHERE ($1::text IS NULL OR entity_type = $1)
          AND ($2::text IS NULL OR event_type = $2)
          AND ($3::text IS NULL OR entity_id = $3)
          AND ($4::timestamptz IS NULL OR occurred_at >= $4)
          AND ($5::timestamptz IS NULL OR occurred_at <= $5)
        ORDER BY occurred_at DESC
        LIMIT $6
        "#,
    )
    .bind(filter.entity_type.as_deref())
    .bind(filter.event_type.as_deref())
    .bind(filter.entity_id.as_deref())
    .bind(filter.occurred_from)
    .bind(filter.occurred_to)
    .bind(filter.limit)
    .fetch_all(pool)
    .await?;

    Ok(records)
}

/// The most recent N audit records across all entities
pub async fn recent_audit_logs(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<AuditRecord>, AuditQueryError> {
    validate_limit(limit)?;

    let records = sqlx::query_as::<_, AuditRecord>(
        r#"
        SELECT id, event_id, event_type, entity_type, entity_id, actor,
               occurred_at, before_state, after_state, incomplete, recorded_at
        FROM audit_records
        ORDER BY occurred_at DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(records)
}

/// Full mutation history for one entity, newest first
pub async fn audit_logs_for_entity(
    pool: &PgPool,
    entity_type: &str,
    entity_id: &str,
    limit: i64,
) -> Result<Vec<AuditRecord>, AuditQueryError> {
    validate_limit(limit)?;

    let records = sqlx::query_as::<_, AuditRecord>(
        r#"
        SELECT id, event_id, event_type, entity_type, entity_id, actor,
               occurred_at, before_state, after_state, incomplete, recorded_at
        FROM audit_records
        WHERE entity_type = $1 AND entity_id = $2
        ORDER BY occurred_at DESC
        LIMIT $3
        "#,
    )
    .bind(entity_type)
    .bind(entity_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(records)
}
