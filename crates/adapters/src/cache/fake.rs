// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake cache backend for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{CacheBackend, CacheError};
use async_trait::async_trait;
use shop_core::KeyPattern;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Recorded cache call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheCall {
    Get { key: String },
    Set { key: String, ttl: Duration },
    Delete { key: String },
    DeleteMatching { pattern: String },
}

#[derive(Default)]
struct FakeCacheState {
    entries: BTreeMap<String, String>,
    calls: Vec<CacheCall>,
    failing: bool,
}

/// Cache backend without expiry that records calls and can be made to fail
#[derive(Clone, Default)]
pub struct FakeCacheBackend {
    inner: Arc<Mutex<FakeCacheState>>,
}

impl FakeCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<CacheCall> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .calls
            .clone()
    }

    /// Stored keys, sorted
    pub fn keys(&self) -> Vec<String> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entries
            .keys()
            .cloned()
            .collect()
    }

    /// Raw stored value
    pub fn raw(&self, key: &str) -> Option<String> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entries
            .get(key)
            .cloned()
    }

    /// Store a raw value directly, bypassing call recording
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entries
            .insert(key.to_string(), value.to_string());
    }

    /// Make every subsequent call fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).failing = failing;
    }

    fn record(&self, call: CacheCall) -> Result<MutexGuard<'_, FakeCacheState>, CacheError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.calls.push(call);
        if inner.failing {
            return Err(CacheError::Unavailable("injected failure".to_string()));
        }
        Ok(inner)
    }
}

#[async_trait]
impl CacheBackend for FakeCacheBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let inner = self.record(CacheCall::Get {
            key: key.to_string(),
        })?;
        Ok(inner.entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut inner = self.record(CacheCall::Set {
            key: key.to_string(),
            ttl,
        })?;
        inner.entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let mut inner = self.record(CacheCall::Delete {
            key: key.to_string(),
        })?;
        Ok(inner.entries.remove(key).is_some())
    }

    async fn delete_matching(&self, pattern: &KeyPattern) -> Result<usize, CacheError> {
        let mut inner = self.record(CacheCall::DeleteMatching {
            pattern: pattern.to_string(),
        })?;
        let before = inner.entries.len();
        inner.entries.retain(|key, _| !pattern.matches(key));
        Ok(before - inner.entries.len())
    }
}
