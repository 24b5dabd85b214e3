// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-through cache adapters
//!
//! `CacheBackend` is the raw, fallible store. `Cache` wraps it for the
//! engine and swallows every failure: a broken cache degrades to a miss,
//! never to a failed operation.

mod memory;
mod noop;

pub use memory::MemoryCacheBackend;
pub use noop::NoOpCacheBackend;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{CacheCall, FakeCacheBackend};

use async_trait::async_trait;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Serialize;
use shop_core::{CacheKey, KeyPattern};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

const KEY_PREFIX: &str = "cache:";

/// Fraction of the TTL that jitter may add or remove
const JITTER: f64 = 0.1;

/// Errors from cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
    #[error("cache value could not be (de)serialized: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Raw key/value store with expiry
#[async_trait]
pub trait CacheBackend: Clone + Send + Sync + 'static {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    /// Returns whether a value was removed
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Remove every key matching `pattern`, returning how many went
    async fn delete_matching(&self, pattern: &KeyPattern) -> Result<usize, CacheError>;
}

/// Best-effort typed cache used by the engine
#[derive(Clone)]
pub struct Cache<B> {
    backend: B,
    jitter: bool,
}

impl<B: CacheBackend> Cache<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            jitter: true,
        }
    }

    /// Store TTLs exactly as given
    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn storage_key(key: &CacheKey) -> String {
        format!("{KEY_PREFIX}{key}")
    }

    fn jittered(&self, ttl: Duration) -> Duration {
        if !self.jitter {
            return ttl;
        }
        let factor = rand::thread_rng().gen_range((1.0 - JITTER)..=(1.0 + JITTER));
        ttl.mul_f64(factor)
    }

    /// Cached value of `key`, if present and readable as `T`
    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let raw = match self.backend.get(&Self::storage_key(key)).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(%key, error = %e, "cache read failed, treating as miss");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(%key, error = %e, "cached value unreadable, treating as miss");
                None
            }
        }
    }

    /// Cached value of `key`, or the result of `load` (stored on success)
    ///
    /// Errors from `load` are returned untouched and nothing is cached.
    pub async fn get_or_load<T, E, F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Duration,
        load: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
    {
        if let Some(hit) = self.get(key).await {
            tracing::trace!(%key, "cache hit");
            return Ok(hit);
        }
        tracing::trace!(%key, "cache miss");

        let value = load().await?;
        self.put(key, &value, ttl).await;
        Ok(value)
    }

    /// Store `value` under `key`; a zero TTL stores nothing
    pub async fn put<T: Serialize + Sync>(&self, key: &CacheKey, value: &T, ttl: Duration) {
        if ttl.is_zero() {
            return;
        }
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(%key, error = %e, "value not cacheable, skipped");
                return;
            }
        };
        if let Err(e) = self
            .backend
            .set(&Self::storage_key(key), raw, self.jittered(ttl))
            .await
        {
            tracing::warn!(%key, error = %e, "cache write failed");
        }
    }

    pub async fn evict(&self, key: &CacheKey) {
        if let Err(e) = self.backend.delete(&Self::storage_key(key)).await {
            tracing::warn!(%key, error = %e, "cache eviction failed");
        }
    }

    pub async fn evict_by_pattern(&self, pattern: &KeyPattern) {
        let prefixed = KeyPattern::new(format!("{KEY_PREFIX}{pattern}"));
        match self.backend.delete_matching(&prefixed).await {
            Ok(removed) => tracing::debug!(%pattern, removed, "cache entries evicted"),
            Err(e) => tracing::warn!(%pattern, error = %e, "cache pattern eviction failed"),
        }
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
