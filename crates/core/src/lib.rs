// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! shop-core: domain model for the storefront concurrency core
//!
//! This crate provides:
//! - Entity state machines for products, coupons, coupon histories, balances,
//!   orders, payments and outbox event records
//! - The lock state machine and the key/ordering scheme every lock goes through
//! - Clock and id abstractions for deterministic tests
//!
//! Nothing here performs I/O.

pub mod clock;
pub mod id;
pub mod keys;
pub mod money;

pub mod coordination;

// Entities (order matters for dependencies)
pub mod balance;
pub mod cache_ttl;
pub mod coupon;
pub mod coupon_history;
pub mod event_log;
pub mod order;
pub mod payment;
pub mod product;
pub mod retry;
pub mod user;

// Re-exports
pub use balance::{Balance, BalanceError};
pub use cache_ttl::CacheTtl;
pub use clock::{Clock, FakeClock, SystemClock};
pub use coordination::{HolderId, Lock, LockConfig, LockEvent, LockInput, LockState};
pub use coupon::{Coupon, CouponError, CouponStatus};
pub use coupon_history::{CouponHistory, CouponHistoryStatus, HistoryError};
pub use event_log::{DomainEvent, EventLog, EventLogError, EventStatus, EventType};
pub use id::{
    CouponHistoryId, CouponId, EventLogId, IdGen, OrderId, PaymentId, ProductId, SequentialIdGen,
    UserId, UuidIdGen,
};
pub use keys::{lock_order, payment_saga_keys, CacheKey, KeyError, KeyPattern, LockKey};
pub use money::{DiscountRate, InvalidDiscountRate, Money};
pub use order::{merge_lines, Order, OrderError, OrderItem, OrderLine, OrderStatus};
pub use payment::{Payment, PaymentStatus};
pub use product::{InventoryError, Product};
pub use retry::RetryPolicy;
pub use user::User;
