//! # EventBus Abstraction
//!
//! Publish-subscribe messaging for the audit pipeline.
//!
//! The producer side of the audit trail publishes domain events here as its
//! final, non-blocking step; the audit merger subscribes with a wildcard
//! pattern and consumes every event type. Delivery is at-least-once from the
//! consumer's perspective, so consumers are expected to deduplicate on the
//! envelope's `event_id`.
//!
//! ## Implementations
//!
//! - [`NatsBus`]: production implementation backed by an `async_nats` client
//! - [`InMemoryBus`]: tokio broadcast channels for dev and tests, with
//!   NATS-style wildcard matching so wildcard subscriptions behave the same
//!
//! ## Usage
//!
//! ```rust,no_run
//! use event_bus::{EventBus, InMemoryBus};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let bus: Arc<dyn EventBus> = Arc::new(InMemoryBus::new());
//!
//! bus.publish("workforce.events.employee.created", b"{}".to_vec()).await?;
//!
//! let mut stream = bus.subscribe("workforce.events.>").await?;
//! while let Some(msg) = futures::StreamExt::next(&mut stream).await {
//!     println!("{} bytes on {}", msg.payload.len(), msg.subject);
//! }
//! # Ok(())
//! # }
//! ```

pub mod consumer_retry;
mod envelope;
mod inmemory_bus;
mod nats_bus;

pub use envelope::{validate_envelope_fields, EventEnvelope};
pub use inmemory_bus::InMemoryBus;
pub use nats_bus::NatsBus;

use async_trait::async_trait;
use futures::stream::BoxStream;
use std::fmt;

/// A message received from the event bus
#[derive(Debug, Clone)]
pub struct BusMessage {
    /// The subject this message was published to
    pub subject: String,
    /// Raw message payload (serialized envelope)
    pub payload: Vec<u8>,
}

impl BusMessage {
    pub fn new(subject: String, payload: Vec<u8>) -> Self {
        Self { subject, payload }
    }
}

/// Errors that can occur when using the event bus
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("failed to publish message: {0}")]
    PublishError(String),

    #[error("failed to subscribe to subject: {0}")]
    SubscribeError(String),

    #[error("connection error: {0}")]
    ConnectionError(String),

    #[error("serialization error: {0}")]
    SerializationError(String),
}

/// Result type for event bus operations
pub type BusResult<T> = Result<T, BusError>;

/// Core publish-subscribe abstraction.
///
/// Publishing is fire-and-forget: a successful return means the message was
/// handed to the broker, not that any consumer processed it.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish a message to a subject (e.g. `workforce.events.employee.created`).
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> BusResult<()>;

    /// Subscribe to messages matching a subject pattern.
    ///
    /// Patterns support NATS wildcards: `*` matches one token,
    /// `>` matches one or more trailing tokens.
    async fn subscribe(&self, subject: &str) -> BusResult<BoxStream<'static, BusMessage>>;
}

impl fmt::Debug for dyn EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventBus")
    }
}
