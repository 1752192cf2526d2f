//! In-memory implementation of the EventBus trait for testing and development

use crate::{BusMessage, BusResult, EventBus};
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast;

/// EventBus backed by a tokio broadcast channel.
///
/// Suitable for unit tests, local development without a broker, and
/// integration tests that need a fast, isolated bus. Every subscriber sees
/// every published message; subject filtering happens on the subscriber
/// side with NATS-style wildcard matching.
#[derive(Clone)]
pub struct InMemoryBus {
    // Single shared channel; a large buffer avoids dropping messages when a
    // subscriber is briefly slow.
    sender: Arc<broadcast::Sender<BusMessage>>,
}

impl InMemoryBus {
    /// Create a bus with the default buffer of 1000 messages.
    pub fn new() -> Self {
        Self::with_capacity(1000)
    }

    /// Create a bus with a custom buffer size. Oldest messages are dropped
    /// once the buffer is exceeded.
    pub fn with_capacity(buffer_size: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer_size);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Check whether a subject matches a subscription pattern.
    ///
    /// - `*` matches exactly one token
    /// - `>` matches one or more trailing tokens
    fn matches_pattern(subject: &str, pattern: &str) -> bool {
        let mut subject_tokens = subject.split('.');
        let mut pattern_tokens = pattern.split('.');

        loop {
            match (subject_tokens.next(), pattern_tokens.next()) {
                // `>` consumes one or more remaining tokens, never zero
                (Some(_), Some(">")) => return true,
                (Some(_), Some("*")) => continue,
                (Some(s), Some(p)) if s == p => continue,
                (None, None) => return true,
                _ => return false,
            }
        }
    }
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventBus for InMemoryBus {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> BusResult<()> {
        let msg = BusMessage::new(subject.to_string(), payload);

        // A send error only means there are no subscribers yet; publishing
        // into the void is valid fire-and-forget behavior.
        let _ = self.sender.send(msg);

        Ok(())
    }

    async fn subscribe(&self, pattern: &str) -> BusResult<BoxStream<'static, BusMessage>> {
        let mut receiver = self.sender.subscribe();
        let pattern = pattern.to_string();

        let stream = async_stream::stream! {
            loop {
                match receiver.recv().await {
                    Ok(msg) => {
                        if Self::matches_pattern(&msg.subject, &pattern) {
                            yield msg;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "InMemoryBus subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        };

        Ok(stream.boxed())
    }
}
