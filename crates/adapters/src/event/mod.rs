// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event stream publishing adapters

mod channel;
mod noop;

pub use channel::{ChannelPublisher, Delivery};
pub use noop::NoOpPublisher;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakePublisher, PublishCall};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shop_core::{EventLog, EventLogId, EventType};
use thiserror::Error;

/// Errors from publishing an event
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PublishError {
    #[error("event stream closed")]
    Closed,
    #[error("publish to {topic} failed: {reason}")]
    Failed { topic: String, reason: String },
}

/// What goes onto the stream for one outbox record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundEvent {
    pub event_log_id: EventLogId,
    pub event_type: EventType,
    /// Partition key, e.g. `order:42`
    pub key: String,
    /// Serialized domain event
    pub payload: String,
    pub correlation_id: String,
}

impl From<&EventLog> for OutboundEvent {
    fn from(log: &EventLog) -> Self {
        Self {
            event_log_id: log.id,
            event_type: log.event_type,
            key: log.partition_key.clone(),
            payload: log.payload.clone(),
            correlation_id: log.correlation_id.clone(),
        }
    }
}

/// Publishes events to named topics on an external stream
#[async_trait]
pub trait EventPort: Clone + Send + Sync + 'static {
    async fn publish(&self, topic: &str, event: &OutboundEvent) -> Result<(), PublishError>;

    /// Fire-and-forget publish; failures are only logged
    ///
    /// Must be called from within a tokio runtime.
    fn publish_async(&self, topic: &str, event: OutboundEvent) {
        let port = self.clone();
        let topic = topic.to_string();
        tokio::spawn(async move {
            if let Err(e) = port.publish(&topic, &event).await {
                tracing::warn!(
                    topic = %topic,
                    event_log_id = %event.event_log_id,
                    error = %e,
                    "background publish failed"
                );
            }
        });
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
