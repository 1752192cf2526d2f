//! DLQ behavior tests.
//!
//! Verify that malformed or invalid events land in `failed_events` with the
//! failure context intact, and that unparseable garbage never panics the
//! consumer. Run with:
//!
//! ```bash
//! cargo test --test dlq_behavior_test -- --ignored
//! ```
//!
//! Requires:
//! - PostgreSQL at localhost:5439 (or set `DATABASE_URL`)

mod common;

use audit_rs::dlq::handle_processing_error;
use audit_rs::snapshot_store::{MokaSnapshotStore, SnapshotStore};
use audit_rs::start_audit_consumer;
use event_bus::{BusMessage, EventBus, InMemoryBus};
use serde_json::json;
use serial_test::serial;
use sqlx::{PgPool, Row};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use common::{cleanup_audit_records, get_test_pool};

async fn dlq_row(pool: &PgPool, event_id: Uuid) -> Option<(String, String, i32)> {
    sqlx::query(
        "SELECT subject, error, retry_count FROM failed_events WHERE event_id = $1",
    )
    .bind(event_id)
    .fetch_optional(pool)
    .await
    .expect("query failed")
    .map(|row| (row.get("subject"), row.get("error"), row.get("retry_count")))
}

async fn wait_for_dlq_row(pool: &PgPool, event_id: Uuid) -> (String, String, i32) {
    for _ in 0..50 {
        if let Some(row) = dlq_row(pool, event_id).await {
            return row;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("DLQ row for {event_id} never appeared");
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_handle_processing_error_writes_dlq_row() {
    let pool = get_test_pool().await;
    let event_id = Uuid::new_v4();

    let msg = BusMessage::new(
        "workforce.events.employee.updated".to_string(),
        serde_json::to_vec(&json!({
            "event_id": event_id.to_string(),
            "event_type": "EmployeeUpdated",
            "occurred_at": "2026-08-01T10:00:00Z",
            "payload": {
                "entity_type": "EMPLOYEE",
                "entity_id": "dlq-emp-1",
                "action": "UPDATED"
            }
        }))
        .unwrap(),
    );

    handle_processing_error(&pool, &msg, "Database error: connection refused", 3).await;

    let (subject, error, retry_count) = dlq_row(&pool, event_id)
        .await
        .expect("DLQ row missing");
    assert_eq!(subject, "workforce.events.employee.updated");
    assert_eq!(error, "Database error: connection refused");
    assert_eq!(retry_count, 3);

    cleanup_audit_records(&pool, "dlq-emp").await;
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_envelope_without_event_id_still_dead_lettered() {
    let pool = get_test_pool().await;

    // Unique error text so the row can be found without an event_id
    let marker = format!("merge failed {}", Uuid::new_v4());

    let msg = BusMessage::new(
        "workforce.events.employee.created".to_string(),
        serde_json::to_vec(&json!({
            "event_type": "EmployeeCreated",
            "occurred_at": "2026-08-01T10:00:00Z",
            "payload": {
                "entity_type": "EMPLOYEE",
                "entity_id": "dlq-no-id-emp-1",
                "action": "CREATED"
            }
        }))
        .unwrap(),
    );

    handle_processing_error(&pool, &msg, &marker, 0).await;

    let row = sqlx::query("SELECT event_id, subject FROM failed_events WHERE error = $1")
        .bind(&marker)
        .fetch_one(&pool)
        .await
        .expect("DLQ row missing");
    assert_eq!(row.get::<Option<Uuid>, _>("event_id"), None);
    assert_eq!(
        row.get::<String, _>("subject"),
        "workforce.events.employee.created"
    );

    sqlx::query("DELETE FROM failed_events WHERE error = $1")
        .bind(&marker)
        .execute(&pool)
        .await
        .ok();
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_unparseable_payload_is_dropped_without_dlq_row() {
    let pool = get_test_pool().await;

    let before: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM failed_events")
        .fetch_one(&pool)
        .await
        .unwrap();

    let msg = BusMessage::new(
        "workforce.events.employee.created".to_string(),
        b"\xff\xfe not json".to_vec(),
    );

    // Must not panic; a non-JSON payload cannot go into the JSONB column
    handle_processing_error(&pool, &msg, "some failure", 0).await;

    let after: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM failed_events")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_consumer_routes_invalid_payload_to_dlq_without_retry() {
    let pool = get_test_pool().await;

    let bus: Arc<dyn EventBus> = Arc::new(InMemoryBus::new());
    let store: Arc<dyn SnapshotStore> = Arc::new(MokaSnapshotStore::with_default_ttl());

    start_audit_consumer(bus.clone(), pool.clone(), store).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Well-formed envelope, invalid payload (empty entity_id): deterministic
    // failure, so the consumer must DLQ it immediately with retry_count 0
    let event_id = Uuid::new_v4();
    bus.publish(
        "workforce.events.employee.created",
        serde_json::to_vec(&json!({
            "event_id": event_id.to_string(),
            "event_type": "EmployeeCreated",
            "occurred_at": "2026-08-01T10:00:00Z",
            "payload": {
                "entity_type": "EMPLOYEE",
                "entity_id": "",
                "action": "CREATED"
            }
        }))
        .unwrap(),
    )
    .await
    .unwrap();

    let (subject, error, retry_count) = wait_for_dlq_row(&pool, event_id).await;
    assert_eq!(subject, "workforce.events.employee.created");
    assert!(error.contains("entity_id"));
    assert_eq!(retry_count, 0);

    // No audit record was created for it
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM audit_records WHERE event_id = $1")
            .bind(event_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(count, 0);

    sqlx::query("DELETE FROM failed_events WHERE event_id = $1")
        .bind(event_id)
        .execute(&pool)
        .await
        .ok();
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_consumer_survives_garbage_then_processes_next_message() {
    let pool = get_test_pool().await;
    cleanup_audit_records(&pool, "dlq-survive").await;

    let bus: Arc<dyn EventBus> = Arc::new(InMemoryBus::new());
    let store: Arc<dyn SnapshotStore> = Arc::new(MokaSnapshotStore::with_default_ttl());

    start_audit_consumer(bus.clone(), pool.clone(), store.clone()).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Garbage first: the consumer logs it and keeps going
    bus.publish(
        "workforce.events.employee.created",
        b"{definitely not an envelope".to_vec(),
    )
    .await
    .unwrap();

    // Then a valid event, which must still be processed
    let event_id = Uuid::new_v4();
    store
        .put(
            event_id,
            audit_rs::snapshot_store::SnapshotPhase::After,
            json!({"id": "dlq-survive-emp-1"}),
        )
        .await
        .unwrap();

    bus.publish(
        "workforce.events.employee.created",
        serde_json::to_vec(&json!({
            "event_id": event_id.to_string(),
            "event_type": "EmployeeCreated",
            "occurred_at": "2026-08-01T10:00:00Z",
            "payload": {
                "entity_type": "EMPLOYEE",
                "entity_id": "dlq-survive-emp-1",
                "action": "CREATED"
            }
        }))
        .unwrap(),
    )
    .await
    .unwrap();

    for _ in 0..50 {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM audit_records WHERE event_id = $1")
                .bind(event_id)
                .fetch_one(&pool)
                .await
                .unwrap();
        if count == 1 {
            cleanup_audit_records(&pool, "dlq-survive").await;
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    panic!("valid event after garbage was never processed");
}
