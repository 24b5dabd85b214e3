// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for external I/O: distributed locks, the read cache, and the
//! event stream

pub mod cache;
pub mod event;
pub mod lock;
pub mod traced;

pub use cache::{Cache, CacheBackend, CacheError, MemoryCacheBackend, NoOpCacheBackend};
pub use event::{ChannelPublisher, Delivery, EventPort, NoOpPublisher, OutboundEvent, PublishError};
pub use lock::{FairLockAdapter, LocalLockAdapter, LockBackend, LockError, LockPort, MemoryLockBackend};
pub use traced::{TracedCacheBackend, TracedEventPort, TracedLock};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use cache::{CacheCall, FakeCacheBackend};
#[cfg(any(test, feature = "test-support"))]
pub use event::{FakePublisher, PublishCall};
#[cfg(any(test, feature = "test-support"))]
pub use lock::{FakeLockAdapter, LockCall};
