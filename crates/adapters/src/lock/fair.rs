// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fair lock over a backend shared by every service instance
//!
//! Waiters queue in arrival order and give up after the configured wait time.
//! Grants carry a lease so a crashed holder cannot block a key forever.

use super::{log_lock_events, LockError, LockPort};
use async_trait::async_trait;
use shop_core::{Clock, HolderId, Lock, LockConfig, LockEvent, LockInput, LockKey};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

const KEY_PREFIX: &str = "lock:";

/// Storage and arbitration for fair locks
///
/// Implementations own the FIFO queue and the leases; `FairLockAdapter` only
/// drives the wait loop.
#[async_trait]
pub trait LockBackend: Clone + Send + Sync + 'static {
    /// One attempt: `Ok(true)` when granted or re-entered, `Ok(false)` when
    /// the caller is (still) queued
    async fn try_acquire(
        &self,
        key: &str,
        holder: &HolderId,
        lease: Duration,
    ) -> Result<bool, LockError>;

    /// `Ok(false)` when the caller did not hold the key
    async fn release(&self, key: &str, holder: &HolderId) -> Result<bool, LockError>;

    /// Leave the queue without acquiring
    async fn abandon(&self, key: &str, holder: &HolderId) -> Result<(), LockError>;

    async fn is_locked(&self, key: &str) -> Result<bool, LockError>;

    /// Wait until `key` may have changed hands, or `timeout` passes
    async fn wait_for_change(&self, key: &str, timeout: Duration);
}

/// Fair, reentrant, leased lock with bounded wait
#[derive(Clone)]
pub struct FairLockAdapter<B> {
    backend: B,
    config: LockConfig,
}

impl<B: LockBackend> FairLockAdapter<B> {
    pub fn new(backend: B, config: LockConfig) -> Self {
        Self { backend, config }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn backend_key(key: &LockKey) -> String {
        format!("{KEY_PREFIX}{key}")
    }
}

#[async_trait]
impl<B: LockBackend> LockPort for FairLockAdapter<B> {
    async fn acquire(&self, key: &LockKey, holder: &HolderId) -> bool {
        let backend_key = Self::backend_key(key);
        let deadline = tokio::time::Instant::now() + self.config.wait_time;
        let mut slot = QueueSlot::new(&self.backend, &backend_key, holder);

        loop {
            match self
                .backend
                .try_acquire(&backend_key, holder, self.config.lease_time)
                .await
            {
                Ok(true) => {
                    slot.disarm();
                    return true;
                }
                Ok(false) => {}
                Err(e) => {
                    slot.disarm();
                    tracing::warn!(%key, %holder, error = %e, "lock backend failed, treating as not acquired");
                    return false;
                }
            }

            let now = tokio::time::Instant::now();
            if now >= deadline {
                slot.disarm();
                if let Err(e) = self.backend.abandon(&backend_key, holder).await {
                    tracing::warn!(%key, %holder, error = %e, "failed to leave lock queue");
                }
                tracing::debug!(%key, %holder, wait_ms = self.config.wait_time.as_millis() as u64, "lock wait timed out");
                return false;
            }

            let remaining = deadline - now;
            self.backend
                .wait_for_change(&backend_key, remaining.min(self.config.poll_interval))
                .await;
        }
    }

    async fn release(&self, key: &LockKey, holder: &HolderId) {
        match self.backend.release(&Self::backend_key(key), holder).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(%key, %holder, "release of a lock not held by caller ignored")
            }
            Err(e) => tracing::warn!(%key, %holder, error = %e, "lock release failed"),
        }
    }

    async fn is_locked(&self, key: &LockKey) -> bool {
        match self.backend.is_locked(&Self::backend_key(key)).await {
            Ok(locked) => locked,
            Err(e) => {
                tracing::warn!(%key, error = %e, "lock backend failed during lookup");
                false
            }
        }
    }
}

/// Queue place of a waiting `acquire`
///
/// Dropping an `acquire` future mid-wait (an outer timeout, a cancelled
/// request) would otherwise leave its waiter at the head of the queue until
/// the waiter expires, refusing everyone behind it.
struct QueueSlot<'a, B: LockBackend> {
    backend: &'a B,
    key: &'a str,
    holder: &'a HolderId,
    armed: bool,
}

impl<'a, B: LockBackend> QueueSlot<'a, B> {
    fn new(backend: &'a B, key: &'a str, holder: &'a HolderId) -> Self {
        Self {
            backend,
            key,
            holder,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl<B: LockBackend> Drop for QueueSlot<'_, B> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(key = self.key, holder = %self.holder, "no runtime to leave lock queue");
            return;
        };
        let backend = self.backend.clone();
        let key = self.key.to_string();
        let holder = self.holder.clone();
        runtime.spawn(async move {
            if let Err(e) = backend.abandon(&key, &holder).await {
                tracing::warn!(key, %holder, error = %e, "failed to leave lock queue");
            }
        });
    }
}

/// Shared in-memory lock table
///
/// Every clone sees the same table, so adapters built over clones of one
/// backend contend with each other like separate service instances would.
#[derive(Clone)]
pub struct MemoryLockBackend<C> {
    locks: Arc<Mutex<HashMap<String, Lock>>>,
    changed: Arc<Notify>,
    clock: C,
}

impl<C: Clock> MemoryLockBackend<C> {
    pub fn new(clock: C) -> Self {
        Self {
            locks: Arc::new(Mutex::new(HashMap::new())),
            changed: Arc::new(Notify::new()),
            clock,
        }
    }

    fn apply(
        &self,
        key: &str,
        lease: Option<Duration>,
        input: LockInput,
    ) -> Result<Vec<LockEvent>, LockError> {
        let lock_key = LockKey::parse(key.strip_prefix(KEY_PREFIX).unwrap_or(key))
            .map_err(|e| LockError::Unavailable(e.to_string()))?;

        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        let mut current = locks
            .remove(key)
            .unwrap_or_else(|| Lock::new(lock_key, lease.unwrap_or_default()));
        if let Some(lease) = lease {
            current.lease_time = lease;
        }
        let (next, events) = current.transition(input, &self.clock);
        let freed = next.is_free();
        if !next.is_idle() {
            locks.insert(key.to_string(), next);
        }
        drop(locks);

        if freed {
            self.changed.notify_waiters();
        }
        Ok(events)
    }

    /// Expire leases and stale waiters across the table
    pub fn tick(&self) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        let mut events = Vec::new();
        locks.retain(|_, lock| {
            let (next, mut produced) = lock.transition(LockInput::Tick, &self.clock);
            *lock = next;
            events.append(&mut produced);
            !lock.is_idle()
        });
        drop(locks);

        log_lock_events(&events);
        if !events.is_empty() {
            self.changed.notify_waiters();
        }
    }
}

#[async_trait]
impl<C: Clock> LockBackend for MemoryLockBackend<C> {
    async fn try_acquire(
        &self,
        key: &str,
        holder: &HolderId,
        lease: Duration,
    ) -> Result<bool, LockError> {
        let events = self.apply(
            key,
            Some(lease),
            LockInput::Acquire {
                holder: holder.clone(),
            },
        )?;
        log_lock_events(&events);
        Ok(events
            .iter()
            .any(|e| matches!(e, LockEvent::Acquired { .. } | LockEvent::Reentered { .. })))
    }

    async fn release(&self, key: &str, holder: &HolderId) -> Result<bool, LockError> {
        let events = self.apply(
            key,
            None,
            LockInput::Release {
                holder: holder.clone(),
            },
        )?;
        Ok(events
            .iter()
            .any(|e| matches!(e, LockEvent::Released { .. })))
    }

    async fn abandon(&self, key: &str, holder: &HolderId) -> Result<(), LockError> {
        self.apply(
            key,
            None,
            LockInput::Abandon {
                holder: holder.clone(),
            },
        )?;
        Ok(())
    }

    async fn is_locked(&self, key: &str) -> Result<bool, LockError> {
        let locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        Ok(locks.get(key).is_some_and(|l| l.is_locked(&self.clock)))
    }

    async fn wait_for_change(&self, _key: &str, timeout: Duration) {
        let _ = tokio::time::timeout(timeout, self.changed.notified()).await;
    }
}
