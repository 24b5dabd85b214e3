// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op publisher for deployments without an event stream.

use super::{EventPort, OutboundEvent, PublishError};
use async_trait::async_trait;

/// Publisher that accepts and drops every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpPublisher;

impl NoOpPublisher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventPort for NoOpPublisher {
    async fn publish(&self, _topic: &str, _event: &OutboundEvent) -> Result<(), PublishError> {
        Ok(())
    }
}
