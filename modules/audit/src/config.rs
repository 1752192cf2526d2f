use std::env;
use std::time::Duration;

/// Application configuration parsed from environment variables.
///
/// Passed explicitly into each component's constructor at process start;
/// there is no ambient/global configuration state.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bus_type: String,
    pub nats_url: String,
    pub host: String,
    pub port: u16,
    /// How long snapshots survive unread in the snapshot store
    pub snapshot_ttl: Duration,
    /// Per-operation timeout for producer-side snapshot writes
    pub snapshot_op_timeout: Duration,
    /// Surface publish failures to callers instead of swallowing them
    pub publish_failure_fatal: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;

        let bus_type = env::var("BUS_TYPE").unwrap_or_else(|_| "inmemory".to_string());

        let nats_url =
            env::var("NATS_URL").unwrap_or_else(|_| "nats://localhost:4222".to_string());

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port: u16 = env::var("PORT")
            .unwrap_or_else(|_| "8095".to_string())
            .parse()
            .map_err(|_| "PORT must be a valid u16".to_string())?;

        let snapshot_ttl_secs: u64 = env::var("SNAPSHOT_TTL_SECS")
            .unwrap_or_else(|_| "3600".to_string())
            .parse()
            .map_err(|_| "SNAPSHOT_TTL_SECS must be a valid u64".to_string())?;

        let snapshot_op_timeout_ms: u64 = env::var("SNAPSHOT_OP_TIMEOUT_MS")
            .unwrap_or_else(|_| "500".to_string())
            .parse()
            .map_err(|_| "SNAPSHOT_OP_TIMEOUT_MS must be a valid u64".to_string())?;

        let publish_failure_fatal = env::var("PUBLISH_FAILURE_FATAL")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        Ok(Config {
            database_url,
            bus_type,
            nats_url,
            host,
            port,
            snapshot_ttl: Duration::from_secs(snapshot_ttl_secs),
            snapshot_op_timeout: Duration::from_millis(snapshot_op_timeout_ms),
            publish_failure_fatal,
        })
    }
}
