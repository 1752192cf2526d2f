use serde_json::Value as JsonValue;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

/// Insert a failed event into the dead letter table.
///
/// `event_id` is absent when the envelope was malformed enough to not carry
/// a usable one; the row is still written so nothing is dropped silently.
pub async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    event_id: Option<Uuid>,
    subject: &str,
    envelope_json: JsonValue,
    error: &str,
    retry_count: i32,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO failed_events (event_id, subject, envelope_json, error, retry_count)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(event_id)
    .bind(subject)
    .bind(envelope_json)
    .bind(error)
    .bind(retry_count)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
