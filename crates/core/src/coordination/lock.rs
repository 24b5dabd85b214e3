// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock state machine for exclusive resource access
//!
//! A fair, reentrant lock with lease-based expiry. Holders that crash are
//! reclaimed once their lease runs out; waiters are granted the lock in
//! arrival order.

use crate::clock::Clock;
use crate::keys::LockKey;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Unique identifier for a lock holder
///
/// One token per logical operation. Reentrancy is keyed on this token, not on
/// the task or thread that happens to run the operation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HolderId(pub String);

impl HolderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for HolderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lock configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// How long `acquire` waits in the queue before giving up
    #[serde(with = "humantime_serde")]
    pub wait_time: Duration,
    /// How long a grant lasts without release before it can be reclaimed
    #[serde(with = "humantime_serde")]
    pub lease_time: Duration,
    /// How often a queued waiter re-checks a backend that cannot notify
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            wait_time: Duration::from_secs(5),
            lease_time: Duration::from_secs(10),
            poll_interval: Duration::from_millis(50),
        }
    }
}

impl LockConfig {
    pub fn with_wait_time(mut self, wait_time: Duration) -> Self {
        self.wait_time = wait_time;
        self
    }

    pub fn with_lease_time(mut self, lease_time: Duration) -> Self {
        self.lease_time = lease_time;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

/// Lock state
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LockState {
    /// Lock is available
    Free,
    /// Lock is held by a holder
    Held {
        holder: HolderId,
        /// Reentrant acquisitions not yet released
        count: u32,
        leased_until: Instant,
    },
}

/// A holder waiting in line for the lock
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Waiter {
    pub holder: HolderId,
    /// Dropped from the queue if it does not retry before this instant
    pub expires_at: Instant,
}

/// A fair, reentrant, leased lock
#[derive(Clone, Debug)]
pub struct Lock {
    pub key: LockKey,
    pub lease_time: Duration,
    pub state: LockState,
    pub waiters: VecDeque<Waiter>,
}

/// Inputs that can trigger lock transitions
#[derive(Clone, Debug)]
pub enum LockInput {
    /// Attempt to acquire the lock, joining the queue if it is taken
    Acquire { holder: HolderId },
    /// Release one acquisition
    Release { holder: HolderId },
    /// A queued holder stopped waiting
    Abandon { holder: HolderId },
    /// Expire leases and stale waiters (called periodically)
    Tick,
}

/// Observable outcomes of a transition
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LockEvent {
    Acquired {
        key: LockKey,
        holder: HolderId,
    },
    Reentered {
        key: LockKey,
        holder: HolderId,
        count: u32,
    },
    Queued {
        key: LockKey,
        holder: HolderId,
        position: usize,
    },
    Released {
        key: LockKey,
        holder: HolderId,
        remaining: u32,
    },
    /// Release by a holder that does not own the lock
    NotHeld {
        key: LockKey,
        holder: HolderId,
        current: Option<HolderId>,
    },
    LeaseExpired {
        key: LockKey,
        holder: HolderId,
    },
}

impl Lock {
    pub fn new(key: LockKey, lease_time: Duration) -> Self {
        Self {
            key,
            lease_time,
            state: LockState::Free,
            waiters: VecDeque::new(),
        }
    }

    /// Check if the lock is currently free (ignores lease expiry)
    pub fn is_free(&self) -> bool {
        matches!(self.state, LockState::Free)
    }

    /// Check if the lock is held by a specific holder
    pub fn is_held_by(&self, holder: &HolderId) -> bool {
        matches!(&self.state, LockState::Held { holder: h, .. } if h == holder)
    }

    /// Get the current holder, if any
    pub fn holder(&self) -> Option<&HolderId> {
        match &self.state {
            LockState::Free => None,
            LockState::Held { holder, .. } => Some(holder),
        }
    }

    /// Held with a lease that has not run out
    pub fn is_locked(&self, clock: &impl Clock) -> bool {
        match &self.state {
            LockState::Free => false,
            LockState::Held { leased_until, .. } => clock.now() < *leased_until,
        }
    }

    /// Nothing held and nobody waiting; the lock can be dropped from a table
    pub fn is_idle(&self) -> bool {
        self.is_free() && self.waiters.is_empty()
    }

    pub fn queue_position(&self, holder: &HolderId) -> Option<usize> {
        self.waiters.iter().position(|w| &w.holder == holder)
    }

    /// Pure state transition function
    pub fn transition(&self, input: LockInput, clock: &impl Clock) -> (Lock, Vec<LockEvent>) {
        let mut new_lock = self.clone();
        let mut events = Vec::new();
        let now = clock.now();

        new_lock.expire(now, &mut events);

        match input {
            LockInput::Acquire { holder } => new_lock.acquire(holder, now, &mut events),

            LockInput::Release { holder } => match &mut new_lock.state {
                LockState::Held {
                    holder: current,
                    count,
                    ..
                } if *current == holder => {
                    *count -= 1;
                    let remaining = *count;
                    if remaining == 0 {
                        new_lock.state = LockState::Free;
                    }
                    events.push(LockEvent::Released {
                        key: self.key.clone(),
                        holder,
                        remaining,
                    });
                }
                _ => {
                    events.push(LockEvent::NotHeld {
                        key: self.key.clone(),
                        holder,
                        current: new_lock.holder().cloned(),
                    });
                }
            },

            LockInput::Abandon { holder } => {
                new_lock.waiters.retain(|w| w.holder != holder);
            }

            LockInput::Tick => {}
        }

        (new_lock, events)
    }

    fn expire(&mut self, now: Instant, events: &mut Vec<LockEvent>) {
        if let LockState::Held {
            holder,
            leased_until,
            ..
        } = &self.state
        {
            if now >= *leased_until {
                events.push(LockEvent::LeaseExpired {
                    key: self.key.clone(),
                    holder: holder.clone(),
                });
                self.state = LockState::Free;
            }
        }
        self.waiters.retain(|w| now < w.expires_at);
    }

    fn acquire(&mut self, holder: HolderId, now: Instant, events: &mut Vec<LockEvent>) {
        let leased_until = now + self.lease_time;

        match &mut self.state {
            LockState::Held {
                holder: current,
                count,
                leased_until: lease,
            } if *current == holder => {
                *count += 1;
                *lease = leased_until;
                events.push(LockEvent::Reentered {
                    key: self.key.clone(),
                    holder,
                    count: *count,
                });
            }
            LockState::Held { .. } => self.enqueue(holder, now, events),
            LockState::Free => {
                let first_in_line = self.waiters.front().map(|w| &w.holder);
                if first_in_line.is_some_and(|h| *h != holder) {
                    self.enqueue(holder, now, events);
                    return;
                }
                self.waiters.pop_front();
                self.state = LockState::Held {
                    holder: holder.clone(),
                    count: 1,
                    leased_until,
                };
                events.push(LockEvent::Acquired {
                    key: self.key.clone(),
                    holder,
                });
            }
        }
    }

    fn enqueue(&mut self, holder: HolderId, now: Instant, events: &mut Vec<LockEvent>) {
        let expires_at = now + self.lease_time;
        let position = match self.queue_position(&holder) {
            Some(position) => {
                self.waiters[position].expires_at = expires_at;
                position
            }
            None => {
                self.waiters.push_back(Waiter {
                    holder: holder.clone(),
                    expires_at,
                });
                self.waiters.len() - 1
            }
        };
        events.push(LockEvent::Queued {
            key: self.key.clone(),
            holder,
            position,
        });
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
