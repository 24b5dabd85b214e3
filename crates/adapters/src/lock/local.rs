// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process lock for single-instance deployments and tests

use super::{log_lock_events, LockPort};
use async_trait::async_trait;
use shop_core::{Clock, HolderId, Lock, LockEvent, LockInput, LockKey};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Lock table owned by one process
///
/// `acquire` makes a single attempt and never waits: a taken key returns
/// false straight away.
#[derive(Clone)]
pub struct LocalLockAdapter<C> {
    locks: Arc<Mutex<HashMap<LockKey, Lock>>>,
    lease_time: Duration,
    clock: C,
}

impl<C: Clock> LocalLockAdapter<C> {
    pub fn new(lease_time: Duration, clock: C) -> Self {
        Self {
            locks: Arc::new(Mutex::new(HashMap::new())),
            lease_time,
            clock,
        }
    }

    fn apply(&self, key: &LockKey, input: LockInput) -> Vec<LockEvent> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        let current = locks
            .remove(key)
            .unwrap_or_else(|| Lock::new(key.clone(), self.lease_time));
        let (next, events) = current.transition(input, &self.clock);
        if !next.is_idle() {
            locks.insert(key.clone(), next);
        }
        events
    }
}

#[async_trait]
impl<C: Clock> LockPort for LocalLockAdapter<C> {
    async fn acquire(&self, key: &LockKey, holder: &HolderId) -> bool {
        let (granted, events) = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            let current = locks
                .remove(key)
                .unwrap_or_else(|| Lock::new(key.clone(), self.lease_time));
            let (next, events, granted) = try_once(&current, holder, &self.clock);
            if !next.is_idle() {
                locks.insert(key.clone(), next);
            }
            (granted, events)
        };
        log_lock_events(&events);
        granted
    }

    async fn release(&self, key: &LockKey, holder: &HolderId) {
        let events = self.apply(
            key,
            LockInput::Release {
                holder: holder.clone(),
            },
        );
        log_lock_events(&events);
    }

    async fn is_locked(&self, key: &LockKey) -> bool {
        let locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.get(key).is_some_and(|l| l.is_locked(&self.clock))
    }
}

/// One acquisition attempt that never leaves the caller queued
///
/// A refused holder is dropped from the waiters in the same step, so no
/// other caller ever sees it at the head of the queue.
pub(super) fn try_once(
    lock: &Lock,
    holder: &HolderId,
    clock: &impl Clock,
) -> (Lock, Vec<LockEvent>, bool) {
    let (next, mut events) = lock.transition(
        LockInput::Acquire {
            holder: holder.clone(),
        },
        clock,
    );
    let granted = events
        .iter()
        .any(|e| matches!(e, LockEvent::Acquired { .. } | LockEvent::Reentered { .. }));
    if granted {
        return (next, events, true);
    }
    let (next, mut abandoned) = next.transition(
        LockInput::Abandon {
            holder: holder.clone(),
        },
        clock,
    );
    events.append(&mut abandoned);
    (next, events, false)
}
