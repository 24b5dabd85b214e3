// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mutual-exclusion lock adapters

mod fair;
mod local;

pub use fair::{FairLockAdapter, LockBackend, MemoryLockBackend};
pub use local::LocalLockAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeLockAdapter, LockCall};

use async_trait::async_trait;
use shop_core::{HolderId, LockEvent, LockKey};
use thiserror::Error;

/// Errors from a lock backend
///
/// These never reach callers of `LockPort`; a failing backend is reported as
/// a failed acquisition.
#[derive(Debug, Error)]
pub enum LockError {
    #[error("lock backend unavailable: {0}")]
    Unavailable(String),
}

/// Named mutual exclusion shared by every instance of the service
///
/// `acquire` is reentrant per holder and may wait up to a bounded time.
/// Callers must release every successful acquisition exactly once.
#[async_trait]
pub trait LockPort: Clone + Send + Sync + 'static {
    /// Returns false on contention, timeout, or backend failure
    async fn acquire(&self, key: &LockKey, holder: &HolderId) -> bool;

    /// Releasing a key the holder does not own is logged and ignored
    async fn release(&self, key: &LockKey, holder: &HolderId);

    async fn is_locked(&self, key: &LockKey) -> bool;
}

/// Log what a lock transition did
pub(crate) fn log_lock_events(events: &[LockEvent]) {
    for event in events {
        match event {
            LockEvent::Acquired { key, holder } => {
                tracing::trace!(%key, %holder, "lock acquired")
            }
            LockEvent::Reentered { key, holder, count } => {
                tracing::trace!(%key, %holder, count, "lock re-entered")
            }
            LockEvent::Queued {
                key,
                holder,
                position,
            } => tracing::debug!(%key, %holder, position, "lock busy, queued"),
            LockEvent::Released {
                key,
                holder,
                remaining,
            } => tracing::trace!(%key, %holder, remaining, "lock released"),
            LockEvent::NotHeld {
                key,
                holder,
                current,
            } => tracing::warn!(
                %key,
                %holder,
                current = ?current.as_ref().map(|h| h.0.as_str()),
                "release of a lock not held by caller ignored"
            ),
            LockEvent::LeaseExpired { key, holder } => {
                tracing::warn!(%key, %holder, "lock lease expired, reclaimed")
            }
        }
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
