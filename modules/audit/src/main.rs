use axum::{routing::get, Router};
use event_bus::{EventBus, InMemoryBus, NatsBus};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

use audit_rs::{
    config::Config,
    db::init_pool,
    health::health,
    routes::audit_logs::{get_audit_logs, get_audit_logs_for_entity, get_recent_audit_logs},
    snapshot_store::{MokaSnapshotStore, SnapshotStore},
    start_audit_consumer,
};

#[tokio::main]
async fn main() {
    // Load environment variables from .env file (if present)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    tracing::info!("Starting audit service...");

    let config = Config::from_env().expect("Failed to load configuration from environment");

    tracing::info!(
        "Configuration loaded: host={}, port={}, bus_type={}, snapshot_ttl={}s",
        config.host,
        config.port,
        config.bus_type,
        config.snapshot_ttl.as_secs()
    );

    tracing::info!("Connecting to database...");
    let pool = init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Running migrations...");
    sqlx::migrate!("./db/migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let bus: Arc<dyn EventBus> = match config.bus_type.to_lowercase().as_str() {
        "inmemory" => {
            tracing::info!("Using InMemory event bus");
            Arc::new(InMemoryBus::new())
        }
        "nats" => {
            tracing::info!("Connecting to NATS at {}", config.nats_url);
            let client = async_nats::connect(&config.nats_url)
                .await
                .expect("Failed to connect to NATS");
            Arc::new(NatsBus::new(client))
        }
        _ => panic!(
            "Invalid BUS_TYPE: {}. Must be 'inmemory' or 'nats'",
            config.bus_type
        ),
    };

    let store: Arc<dyn SnapshotStore> =
        Arc::new(MokaSnapshotStore::new(config.snapshot_ttl, 100_000));

    // Start the audit consumer
    start_audit_consumer(bus.clone(), pool.clone(), store.clone()).await;

    // Build the read-only query API
    let app = Router::new()
        .route("/api/health", get(health))
        .route("/api/audit/logs", get(get_audit_logs))
        .route("/api/audit/recent", get(get_recent_audit_logs))
        .route(
            "/api/audit/entities/{entity_type}/{entity_id}",
            get(get_audit_logs_for_entity),
        )
        .with_state(Arc::new(pool.clone()))
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Audit service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app)
        .await
        .expect("Server failed to start");
}
