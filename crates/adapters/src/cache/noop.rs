// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op cache backend for when caching is disabled.

use super::{CacheBackend, CacheError};
use async_trait::async_trait;
use shop_core::KeyPattern;
use std::time::Duration;

/// Cache backend that stores nothing, so every read is a miss.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpCacheBackend;

impl NoOpCacheBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CacheBackend for NoOpCacheBackend {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> Result<bool, CacheError> {
        Ok(false)
    }

    async fn delete_matching(&self, _pattern: &KeyPattern) -> Result<usize, CacheError> {
        Ok(0)
    }
}
