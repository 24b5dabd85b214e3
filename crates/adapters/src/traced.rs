// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::cache::{CacheBackend, CacheError};
use crate::event::{EventPort, OutboundEvent, PublishError};
use crate::lock::LockPort;
use async_trait::async_trait;
use shop_core::{HolderId, KeyPattern, LockKey};
use std::time::Duration;
use tracing::Instrument;

/// Wrapper that adds tracing to any LockPort
#[derive(Clone)]
pub struct TracedLock<L> {
    inner: L,
}

impl<L> TracedLock<L> {
    pub fn new(inner: L) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<L: LockPort> LockPort for TracedLock<L> {
    async fn acquire(&self, key: &LockKey, holder: &HolderId) -> bool {
        let span = tracing::info_span!("lock.acquire", %key, %holder);
        async {
            let start = std::time::Instant::now();
            let acquired = self.inner.acquire(key, holder).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            if acquired {
                tracing::debug!(elapsed_ms, "acquired");
            } else {
                tracing::warn!(elapsed_ms, "not acquired");
            }
            acquired
        }
        .instrument(span)
        .await
    }

    async fn release(&self, key: &LockKey, holder: &HolderId) {
        self.inner.release(key, holder).await;
        tracing::debug!(%key, %holder, "released");
    }

    async fn is_locked(&self, key: &LockKey) -> bool {
        let locked = self.inner.is_locked(key).await;
        tracing::trace!(%key, locked, "checked");
        locked
    }
}

/// Wrapper that adds tracing to any CacheBackend
#[derive(Clone)]
pub struct TracedCacheBackend<B> {
    inner: B,
}

impl<B> TracedCacheBackend<B> {
    pub fn new(inner: B) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<B: CacheBackend> CacheBackend for TracedCacheBackend<B> {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let result = self.inner.get(key).await;
        match &result {
            Ok(hit) => tracing::trace!(key, hit = hit.is_some(), "cache get"),
            Err(e) => tracing::warn!(key, error = %e, "cache get failed"),
        }
        result
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let len = value.len();
        let result = self.inner.set(key, value, ttl).await;
        match &result {
            Ok(()) => tracing::trace!(key, len, ttl_ms = ttl.as_millis() as u64, "cache set"),
            Err(e) => tracing::warn!(key, error = %e, "cache set failed"),
        }
        result
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let result = self.inner.delete(key).await;
        match &result {
            Ok(removed) => tracing::debug!(key, removed, "cache delete"),
            Err(e) => tracing::warn!(key, error = %e, "cache delete failed"),
        }
        result
    }

    async fn delete_matching(&self, pattern: &KeyPattern) -> Result<usize, CacheError> {
        let span = tracing::info_span!("cache.delete_matching", %pattern);
        async {
            let start = std::time::Instant::now();
            let result = self.inner.delete_matching(pattern).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            match &result {
                Ok(removed) => tracing::debug!(removed, elapsed_ms, "evicted"),
                Err(e) => tracing::warn!(elapsed_ms, error = %e, "eviction failed"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

/// Wrapper that adds tracing to any EventPort
#[derive(Clone)]
pub struct TracedEventPort<E> {
    inner: E,
}

impl<E> TracedEventPort<E> {
    pub fn new(inner: E) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<E: EventPort> EventPort for TracedEventPort<E> {
    async fn publish(&self, topic: &str, event: &OutboundEvent) -> Result<(), PublishError> {
        let span = tracing::info_span!(
            "event.publish",
            topic,
            event_log_id = %event.event_log_id,
            correlation_id = %event.correlation_id,
        );
        async {
            let start = std::time::Instant::now();
            let result = self.inner.publish(topic, event).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            match &result {
                Ok(()) => tracing::info!(key = %event.key, elapsed_ms, "published"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "publish failed"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
