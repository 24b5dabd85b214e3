// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! shop-storage: the durable store behind the storefront engine
//!
//! Rows live in a `MaterializedState` that is rebuilt on startup by
//! replaying a JSON-lines write-ahead log.

mod op;
mod repo;
mod state;
mod store;
mod wal;

pub use op::{StoreOp, Table};
pub use repo::{
    BalanceRepository, CouponHistoryRepository, CouponRepository, EventLogRepository,
    OrderRepository, PaymentRepository, ProductRepository, Repositories, UserRepository,
};
pub use state::MaterializedState;
pub use store::{Store, StoreError};
pub use wal::{Wal, WalError};
