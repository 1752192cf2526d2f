//! Audit Log API Routes
//!
//! Read-only HTTP endpoints over the audit store. There are no mutation
//! entry points: audit records are created exclusively by the consumer.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::PgPool;
use std::sync::Arc;

use crate::repos::audit_query_repo::AuditQueryError;
use crate::repos::audit_repo::AuditRecord;
use crate::services::audit_query_service::{self, AuditQueryServiceError};

/// Query parameters for GET /api/audit/logs
#[derive(Debug, Deserialize)]
pub struct AuditLogsQuery {
    /// Entity kind filter (e.g. "Employee")
    pub entity_type: Option<String>,
    /// Event type filter (e.g. "EmployeeUpdated")
    pub event_type: Option<String>,
    /// Entity id filter
    pub entity_id: Option<String>,
    /// Inclusive lower bound on occurred_at (RFC 3339)
    pub occurred_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on occurred_at (RFC 3339)
    pub occurred_to: Option<DateTime<Utc>>,
    /// Max records to return (1-500, default 50)
    #[serde(default = "default_limit")]
    pub limit: i64,
}

/// Query parameters for limit-only endpoints
#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

/// Handler for GET /api/audit/logs
///
/// Returns audit records matching the filter combination, newest first.
/// `before_state`/`after_state` are nullable in every record.
pub async fn get_audit_logs(
    State(pool): State<Arc<PgPool>>,
    Query(params): Query<AuditLogsQuery>,
) -> Result<Json<Vec<AuditRecord>>, AuditErrorResponse> {
    let records = audit_query_service::query_audit_logs(
        &pool,
        params.entity_type.as_deref(),
        params.event_type.as_deref(),
        params.entity_id.as_deref(),
        params.occurred_from,
        params.occurred_to,
        params.limit,
    )
    .await
    .map_err(AuditErrorResponse::from)?;

    Ok(Json(records))
}

/// Handler for GET /api/audit/recent
pub async fn get_recent_audit_logs(
    State(pool): State<Arc<PgPool>>,
    Query(params): Query<LimitQuery>,
) -> Result<Json<Vec<AuditRecord>>, AuditErrorResponse> {
    let records = audit_query_service::recent_audit_logs(&pool, params.limit)
        .await
        .map_err(AuditErrorResponse::from)?;

    Ok(Json(records))
}

/// Handler for GET /api/audit/entities/{entity_type}/{entity_id}
///
/// Full mutation history for a single entity, newest first.
pub async fn get_audit_logs_for_entity(
    State(pool): State<Arc<PgPool>>,
    Path((entity_type, entity_id)): Path<(String, String)>,
    Query(params): Query<LimitQuery>,
) -> Result<Json<Vec<AuditRecord>>, AuditErrorResponse> {
    let records =
        audit_query_service::audit_logs_for_entity(&pool, &entity_type, &entity_id, params.limit)
            .await
            .map_err(AuditErrorResponse::from)?;

    Ok(Json(records))
}

/// Error response body
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error response wrapper for proper HTTP error handling
#[derive(Debug)]
pub struct AuditErrorResponse {
    pub status: StatusCode,
    pub message: String,
}

impl From<AuditQueryServiceError> for AuditErrorResponse {
    fn from(e: AuditQueryServiceError) -> Self {
        let status = match &e {
            AuditQueryServiceError::InvalidEntityType(_)
            | AuditQueryServiceError::InvalidEventType(_) => StatusCode::BAD_REQUEST,
            AuditQueryServiceError::Query(AuditQueryError::InvalidDateRange { .. })
            | AuditQueryServiceError::Query(AuditQueryError::InvalidLimit { .. }) => {
                StatusCode::BAD_REQUEST
            }
            AuditQueryServiceError::Query(AuditQueryError::Database(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for AuditErrorResponse {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}
