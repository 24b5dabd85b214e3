// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Repository traits, one per entity
//!
//! Each `save_*` is a full-row upsert. Reads return owned copies; callers
//! mutate a copy and save it back while holding the entity's lock.

use crate::store::StoreError;
use chrono::{DateTime, Utc};
use shop_core::{
    Balance, Coupon, CouponHistory, CouponHistoryId, CouponId, EventLog, EventLogId, Order,
    OrderId, Payment, PaymentId, Product, ProductId, User, UserId,
};

pub trait UserRepository {
    fn find_user(&self, id: UserId) -> Result<Option<User>, StoreError>;
    fn user_exists(&self, id: UserId) -> Result<bool, StoreError>;
    fn save_user(&self, user: &User) -> Result<(), StoreError>;
    fn next_user_id(&self) -> UserId;
}

pub trait BalanceRepository {
    fn find_balance(&self, user: UserId) -> Result<Option<Balance>, StoreError>;
    fn save_balance(&self, balance: &Balance) -> Result<(), StoreError>;
}

pub trait ProductRepository {
    fn find_product(&self, id: ProductId) -> Result<Option<Product>, StoreError>;
    fn save_product(&self, product: &Product) -> Result<(), StoreError>;
    fn next_product_id(&self) -> ProductId;

    /// A page of the catalogue in id order
    fn products(&self, limit: usize, offset: usize) -> Result<Vec<Product>, StoreError>;
}

pub trait CouponRepository {
    fn find_coupon(&self, id: CouponId) -> Result<Option<Coupon>, StoreError>;
    fn save_coupon(&self, coupon: &Coupon) -> Result<(), StoreError>;
    fn next_coupon_id(&self) -> CouponId;

    /// Coupons whose window closed before `now` and are not yet EXPIRED or
    /// DISABLED
    fn coupons_past_end(&self, now: DateTime<Utc>) -> Result<Vec<Coupon>, StoreError>;
}

pub trait CouponHistoryRepository {
    fn find_history(&self, id: CouponHistoryId) -> Result<Option<CouponHistory>, StoreError>;

    /// The single issuance of `coupon` to `user`, if any
    fn find_history_for(
        &self,
        user: UserId,
        coupon: CouponId,
    ) -> Result<Option<CouponHistory>, StoreError>;

    /// A page of a user's histories, newest issuance first
    fn histories_by_user(
        &self,
        user: UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CouponHistory>, StoreError>;

    fn histories_by_coupon(&self, coupon: CouponId) -> Result<Vec<CouponHistory>, StoreError>;
    fn save_history(&self, history: &CouponHistory) -> Result<(), StoreError>;
    fn next_history_id(&self) -> CouponHistoryId;
}

pub trait OrderRepository {
    fn find_order(&self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// A page of a user's orders, newest first
    fn orders_by_user(
        &self,
        user: UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Order>, StoreError>;

    /// COMPLETED orders paid at or after `since`
    fn orders_completed_since(&self, since: DateTime<Utc>) -> Result<Vec<Order>, StoreError>;

    fn save_order(&self, order: &Order) -> Result<(), StoreError>;
    fn next_order_id(&self) -> OrderId;
}

pub trait PaymentRepository {
    fn find_payment(&self, id: PaymentId) -> Result<Option<Payment>, StoreError>;
    fn find_payment_for_order(&self, order: OrderId) -> Result<Option<Payment>, StoreError>;
    fn save_payment(&self, payment: &Payment) -> Result<(), StoreError>;
    fn next_payment_id(&self) -> PaymentId;
}

pub trait EventLogRepository {
    fn find_event_log(&self, id: EventLogId) -> Result<Option<EventLog>, StoreError>;

    /// FAILED rows whose retry time has come, oldest first
    fn failed_events_due(&self, now: DateTime<Utc>) -> Result<Vec<EventLog>, StoreError>;

    fn save_event_log(&self, log: &EventLog) -> Result<(), StoreError>;
    fn next_event_log_id(&self) -> EventLogId;
}

/// Everything the engine needs from storage
pub trait Repositories:
    UserRepository
    + BalanceRepository
    + ProductRepository
    + CouponRepository
    + CouponHistoryRepository
    + OrderRepository
    + PaymentRepository
    + EventLogRepository
    + Clone
    + Send
    + Sync
    + 'static
{
}

impl<T> Repositories for T where
    T: UserRepository
        + BalanceRepository
        + ProductRepository
        + CouponRepository
        + CouponHistoryRepository
        + OrderRepository
        + PaymentRepository
        + EventLogRepository
        + Clone
        + Send
        + Sync
        + 'static
{
}
