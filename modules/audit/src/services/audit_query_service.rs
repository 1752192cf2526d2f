//! Audit query service.
//!
//! Thin validation layer between the HTTP routes and the query repository:
//! entity and event type filters must come from the closed enums before
//! they reach SQL.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::contracts::{AuditEventType, EntityType};
use crate::repos::audit_query_repo::{self, AuditLogFilter, AuditQueryError};
use crate::repos::audit_repo::AuditRecord;

/// Errors from the audit query service
#[derive(Debug, thiserror::Error)]
pub enum AuditQueryServiceError {
    #[error("Unknown entity type: {0}")]
    InvalidEntityType(String),

    #[error("Unknown event type: {0}")]
    InvalidEventType(String),

    #[error(transparent)]
    Query(#[from] AuditQueryError),
}

/// Query audit logs with optional filters.
///
/// `entity_type` and `event_type`, when present, must name members of the
/// closed enums (`"Employee"`, `"EmployeeCreated"`, ...); anything else is
/// rejected rather than silently matching nothing.
pub async fn query_audit_logs(
    pool: &PgPool,
    entity_type: Option<&str>,
    event_type: Option<&str>,
    entity_id: Option<&str>,
    occurred_from: Option<DateTime<Utc>>,
    occurred_to: Option<DateTime<Utc>>,
    limit: i64,
) -> Result<Vec<AuditRecord>, AuditQueryServiceError> {
    if let Some(et) = entity_type {
        et.parse::<EntityType>()
            .map_err(|_| AuditQueryServiceError::InvalidEntityType(et.to_string()))?;
    }

    if let Some(et) = event_type {
        et.parse::<AuditEventType>()
            .map_err(|_| AuditQueryServiceError::InvalidEventType(et.to_string()))?;
    }

    let filter = AuditLogFilter {
        entity_type: entity_type.map(str::to_string),
        event_type: event_type.map(str::to_string),
        entity_id: entity_id.map(str::to_string),
        occurred_from,
        occurred_to,
        limit,
    };

    Ok(audit_query_repo::query_audit_logs(pool, &filter).await?)
}

/// The most recent N audit records
pub async fn recent_audit_logs(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<AuditRecord>, AuditQueryServiceError> {
    Ok(audit_query_repo::recent_audit_logs(pool, limit).await?)
}

/// Mutation history for one entity
pub async fn audit_logs_for_entity(
    pool: &PgPool,
    entity_type: &str,
    entity_id: &str,
    limit: i64,
) -> Result<Vec<AuditRecord>, AuditQueryServiceError> {
    let parsed = entity_type
        .parse::<EntityType>()
        .map_err(|_| AuditQueryServiceError::InvalidEntityType(entity_type.to_string()))?;

    Ok(audit_query_repo::audit_logs_for_entity(pool, parsed.as_str(), entity_id, limit).await?)
}
