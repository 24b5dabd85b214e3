// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process event stream backed by a tokio channel

use super::{EventPort, OutboundEvent, PublishError};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// An event as seen by a stream consumer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub topic: String,
    pub event: OutboundEvent,
}

/// Publisher whose stream is the receiving half of a bounded channel
///
/// Publishing waits while the channel is full and fails once the receiver
/// is dropped.
#[derive(Clone)]
pub struct ChannelPublisher {
    tx: mpsc::Sender<Delivery>,
}

impl ChannelPublisher {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Delivery>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl EventPort for ChannelPublisher {
    async fn publish(&self, topic: &str, event: &OutboundEvent) -> Result<(), PublishError> {
        self.tx
            .send(Delivery {
                topic: topic.to_string(),
                event: event.clone(),
            })
            .await
            .map_err(|_| PublishError::Closed)
    }
}
