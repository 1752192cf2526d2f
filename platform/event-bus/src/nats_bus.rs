//! NATS-based implementation of the EventBus trait

use crate::{BusError, BusMessage, BusResult, EventBus};
use async_nats::Client;
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};

/// Production EventBus backed by a NATS connection.
///
/// Wraps an already-connected `async_nats::Client`. Reconnection and publish
/// retries are handled by the NATS client itself.
#[derive(Clone)]
pub struct NatsBus {
    client: Client,
}

impl NatsBus {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Access the underlying NATS client for features not exposed through
    /// the `EventBus` trait.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl EventBus for NatsBus {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> BusResult<()> {
        self.client
            .publish(subject.to_string(), payload.into())
            .await
            .map_err(|e| BusError::PublishError(e.to_string()))?;

        Ok(())
    }

    async fn subscribe(&self, subject: &str) -> BusResult<BoxStream<'static, BusMessage>> {
        let subscriber = self
            .client
            .subscribe(subject.to_string())
            .await
            .map_err(|e| BusError::SubscribeError(e.to_string()))?;

        let stream = subscriber
            .map(|msg| BusMessage::new(msg.subject.to_string(), msg.payload.to_vec()));

        Ok(stream.boxed())
    }
}
