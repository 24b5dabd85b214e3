// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake lock adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::LockPort;
use async_trait::async_trait;
use shop_core::{HolderId, LockKey};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Recorded lock call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockCall {
    Acquire { key: LockKey, holder: HolderId },
    Release { key: LockKey, holder: HolderId },
    IsLocked { key: LockKey },
}

#[derive(Default)]
struct FakeLockState {
    held: HashMap<LockKey, (HolderId, u32)>,
    denied: HashSet<LockKey>,
    calls: Vec<LockCall>,
}

/// Non-blocking, reentrant lock that records every call
///
/// Keys passed to `deny` are never granted, which lets tests force a
/// concurrency conflict at an exact point in an operation.
#[derive(Clone, Default)]
pub struct FakeLockAdapter {
    inner: Arc<Mutex<FakeLockState>>,
}

impl FakeLockAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<LockCall> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .calls
            .clone()
    }

    /// Keys acquired, in call order
    pub fn acquired_keys(&self) -> Vec<LockKey> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                LockCall::Acquire { key, .. } => Some(key),
                _ => None,
            })
            .collect()
    }

    /// Keys currently held by anyone
    pub fn held(&self) -> Vec<LockKey> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let mut keys: Vec<LockKey> = inner.held.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Refuse every future acquisition of `key`
    pub fn deny(&self, key: LockKey) {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .denied
            .insert(key);
    }
}

#[async_trait]
impl LockPort for FakeLockAdapter {
    async fn acquire(&self, key: &LockKey, holder: &HolderId) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.calls.push(LockCall::Acquire {
            key: key.clone(),
            holder: holder.clone(),
        });

        if inner.denied.contains(key) {
            return false;
        }
        match inner.held.get_mut(key) {
            Some((current, count)) if current == holder => {
                *count += 1;
                true
            }
            Some(_) => false,
            None => {
                inner.held.insert(key.clone(), (holder.clone(), 1));
                true
            }
        }
    }

    async fn release(&self, key: &LockKey, holder: &HolderId) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.calls.push(LockCall::Release {
            key: key.clone(),
            holder: holder.clone(),
        });

        let emptied = match inner.held.get_mut(key) {
            Some((current, count)) if current == holder => {
                *count -= 1;
                *count == 0
            }
            _ => false,
        };
        if emptied {
            inner.held.remove(key);
        }
    }

    async fn is_locked(&self, key: &LockKey) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.calls.push(LockCall::IsLocked { key: key.clone() });
        inner.held.contains_key(key)
    }
}
