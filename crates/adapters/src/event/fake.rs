// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake publisher for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{EventPort, OutboundEvent, PublishError};
use async_trait::async_trait;
use shop_core::EventType;
use std::sync::{Arc, Mutex};

/// Recorded publish call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishCall {
    pub topic: String,
    pub event: OutboundEvent,
    /// Whether the call was made to fail
    pub failed: bool,
}

#[derive(Default)]
struct FakePublisherState {
    calls: Vec<PublishCall>,
    failing: bool,
}

/// Publisher that records calls and can be switched to fail
#[derive(Clone, Default)]
pub struct FakePublisher {
    inner: Arc<Mutex<FakePublisherState>>,
}

impl FakePublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<PublishCall> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .calls
            .clone()
    }

    /// Events that actually went out, in order
    pub fn published(&self) -> Vec<OutboundEvent> {
        self.calls()
            .into_iter()
            .filter(|c| !c.failed)
            .map(|c| c.event)
            .collect()
    }

    /// Types of the events that went out, in order
    pub fn published_types(&self) -> Vec<EventType> {
        self.published().into_iter().map(|e| e.event_type).collect()
    }

    pub fn set_failing(&self, failing: bool) {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).failing = failing;
    }
}

#[async_trait]
impl EventPort for FakePublisher {
    async fn publish(&self, topic: &str, event: &OutboundEvent) -> Result<(), PublishError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let failed = inner.failing;
        inner.calls.push(PublishCall {
            topic: topic.to_string(),
            event: event.clone(),
            failed,
        });

        if failed {
            return Err(PublishError::Failed {
                topic: topic.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}
