// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! shop-engine: the storefront facade
//!
//! `Shop` runs every business operation: balance charges, coupon issuance,
//! orders and the payment saga. Each call takes its locks in the global
//! order, reads and writes the store under them, then evicts stale cache
//! entries and records its outbox events.

mod balance;
mod catalog;
mod config;
mod coupon;
mod error;
mod locking;
mod order;
mod outbox;
mod payment;
mod shop;

pub use catalog::PopularProduct;
pub use config::{CacheConfig, ConfigError, ShopConfig, SweepConfig};
pub use coupon::{ExpiryReport, UserCoupon};
pub use error::{EntityKind, ErrorKind, ShopError};
pub use outbox::{Outbox, RetryReport};
pub use shop::{Shop, ShopDeps};
