// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process cache backend

use super::{CacheBackend, CacheError};
use async_trait::async_trait;
use shop_core::{Clock, KeyPattern};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

struct Entry {
    value: String,
    expires_at: Instant,
}

/// Key/value map with per-entry expiry read from `clock`
///
/// Expired entries are dropped lazily on read and on pattern deletes.
#[derive(Clone)]
pub struct MemoryCacheBackend<C> {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
    clock: C,
}

impl<C: Clock> MemoryCacheBackend<C> {
    pub fn new(clock: C) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            clock,
        }
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|e| now < e.expires_at)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl<C: Clock> CacheBackend for MemoryCacheBackend<C> {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(key) {
            Some(entry) if now < entry.expires_at => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let expires_at = self.clock.now() + ttl;
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key)
            .is_some())
    }

    async fn delete_matching(&self, pattern: &KeyPattern) -> Result<usize, CacheError> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        let mut expired = 0;
        entries.retain(|key, entry| {
            if now >= entry.expires_at {
                expired += 1;
                return false;
            }
            !pattern.matches(key)
        });
        Ok(before - entries.len() - expired)
    }
}
