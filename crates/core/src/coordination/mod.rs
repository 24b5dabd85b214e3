// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordination primitives for shared resource access
//!
//! This module provides:
//! - **Lock** - Reentrant exclusive access with lease expiry and FIFO waiters

pub mod lock;

pub use lock::{HolderId, Lock, LockConfig, LockEvent, LockInput, LockState, Waiter};
