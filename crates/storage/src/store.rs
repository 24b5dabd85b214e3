// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The store: materialized state plus an optional write-ahead log

use crate::op::{StoreOp, Table};
use crate::repo::{
    BalanceRepository, CouponHistoryRepository, CouponRepository, EventLogRepository,
    OrderRepository, PaymentRepository, ProductRepository, UserRepository,
};
use crate::state::MaterializedState;
use crate::wal::{Wal, WalError};
use chrono::{DateTime, Utc};
use shop_core::{
    Balance, Coupon, CouponHistory, CouponHistoryId, CouponId, CouponStatus, EventLog,
    EventLogId, EventStatus, Order, OrderId, OrderStatus, Payment, PaymentId, Product, ProductId,
    User, UserId,
};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors from store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("write-ahead log error: {0}")]
    Wal(#[from] WalError),
    #[error("injected failure writing {table}")]
    Injected { table: Table },
}

struct StoreInner {
    state: MaterializedState,
    wal: Option<Wal>,
    failing: HashSet<Table>,
}

/// Shared handle to the store
///
/// Clones share the same state. Writes go to the WAL first, then to memory,
/// so a failed append leaves the state untouched.
#[derive(Clone)]
pub struct Store {
    inner: Arc<Mutex<StoreInner>>,
}

impl Store {
    /// A store that keeps nothing across restarts
    pub fn in_memory() -> Self {
        Self::from_parts(MaterializedState::default(), None)
    }

    /// Open the WAL at `path`, replaying whatever it already holds
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let ops = Wal::replay(path)?;
        let mut state = MaterializedState::default();
        for op in &ops {
            state.apply(op);
        }
        let wal = Wal::open(path)?;
        tracing::info!(path = %path.display(), replayed = ops.len(), "store opened");
        Ok(Self::from_parts(state, Some(wal)))
    }

    fn from_parts(state: MaterializedState, wal: Option<Wal>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StoreInner {
                state,
                wal,
                failing: HashSet::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> MaterializedState {
        self.lock().state.clone()
    }

    /// Entries written to the WAL, or 0 for an in-memory store
    pub fn wal_sequence(&self) -> u64 {
        self.lock().wal.as_ref().map(Wal::sequence).unwrap_or(0)
    }

    /// Persist and apply one operation
    pub fn write(&self, op: StoreOp) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let table = op.table();
        if inner.failing.contains(&table) {
            return Err(StoreError::Injected { table });
        }
        if let Some(wal) = inner.wal.as_mut() {
            wal.append(&op)?;
        }
        inner.state.apply(&op);
        Ok(())
    }

    fn read<T>(&self, f: impl FnOnce(&MaterializedState) -> T) -> Result<T, StoreError> {
        Ok(f(&self.lock().state))
    }

    fn next_id(&self, table: Table) -> u64 {
        self.lock().state.next_id(table)
    }

    /// Make every write to `table` fail until cleared
    #[cfg(any(test, feature = "test-support"))]
    pub fn inject_failure(&self, table: Table) {
        self.lock().failing.insert(table);
    }

    #[cfg(any(test, feature = "test-support"))]
    pub fn clear_failures(&self) {
        self.lock().failing.clear();
    }
}

fn page<T>(items: impl Iterator<Item = T>, limit: usize, offset: usize) -> Vec<T> {
    items.skip(offset).take(limit).collect()
}

impl UserRepository for Store {
    fn find_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        self.read(|s| s.users.get(&id).cloned())
    }

    fn user_exists(&self, id: UserId) -> Result<bool, StoreError> {
        self.read(|s| s.users.contains_key(&id))
    }

    fn save_user(&self, user: &User) -> Result<(), StoreError> {
        self.write(StoreOp::SaveUser(user.clone()))
    }

    fn next_user_id(&self) -> UserId {
        UserId(self.next_id(Table::Users))
    }
}

impl BalanceRepository for Store {
    fn find_balance(&self, user: UserId) -> Result<Option<Balance>, StoreError> {
        self.read(|s| s.balances.get(&user).cloned())
    }

    fn save_balance(&self, balance: &Balance) -> Result<(), StoreError> {
        self.write(StoreOp::SaveBalance(balance.clone()))
    }
}

impl ProductRepository for Store {
    fn find_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        self.read(|s| s.products.get(&id).cloned())
    }

    fn save_product(&self, product: &Product) -> Result<(), StoreError> {
        self.write(StoreOp::SaveProduct(product.clone()))
    }

    fn next_product_id(&self) -> ProductId {
        ProductId(self.next_id(Table::Products))
    }

    fn products(&self, limit: usize, offset: usize) -> Result<Vec<Product>, StoreError> {
        self.read(|s| page(s.products.values().cloned(), limit, offset))
    }
}

impl CouponRepository for Store {
    fn find_coupon(&self, id: CouponId) -> Result<Option<Coupon>, StoreError> {
        self.read(|s| s.coupons.get(&id).cloned())
    }

    fn save_coupon(&self, coupon: &Coupon) -> Result<(), StoreError> {
        self.write(StoreOp::SaveCoupon(coupon.clone()))
    }

    fn next_coupon_id(&self) -> CouponId {
        CouponId(self.next_id(Table::Coupons))
    }

    fn coupons_past_end(&self, now: DateTime<Utc>) -> Result<Vec<Coupon>, StoreError> {
        self.read(|s| {
            s.coupons
                .values()
                .filter(|c| c.is_expired_at(now))
                .filter(|c| !matches!(c.status, CouponStatus::Expired | CouponStatus::Disabled))
                .cloned()
                .collect()
        })
    }
}

impl CouponHistoryRepository for Store {
    fn find_history(&self, id: CouponHistoryId) -> Result<Option<CouponHistory>, StoreError> {
        self.read(|s| s.coupon_histories.get(&id).cloned())
    }

    fn find_history_for(
        &self,
        user: UserId,
        coupon: CouponId,
    ) -> Result<Option<CouponHistory>, StoreError> {
        self.read(|s| {
            s.coupon_histories
                .values()
                .find(|h| h.user_id == user && h.coupon_id == coupon)
                .cloned()
        })
    }

    fn histories_by_user(
        &self,
        user: UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CouponHistory>, StoreError> {
        self.read(|s| {
            let mine = s
                .coupon_histories
                .values()
                .rev()
                .filter(|h| h.user_id == user)
                .cloned();
            page(mine, limit, offset)
        })
    }

    fn histories_by_coupon(&self, coupon: CouponId) -> Result<Vec<CouponHistory>, StoreError> {
        self.read(|s| {
            s.coupon_histories
                .values()
                .filter(|h| h.coupon_id == coupon)
                .cloned()
                .collect()
        })
    }

    fn save_history(&self, history: &CouponHistory) -> Result<(), StoreError> {
        self.write(StoreOp::SaveCouponHistory(history.clone()))
    }

    fn next_history_id(&self) -> CouponHistoryId {
        CouponHistoryId(self.next_id(Table::CouponHistories))
    }
}

impl OrderRepository for Store {
    fn find_order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        self.read(|s| s.orders.get(&id).cloned())
    }

    fn orders_by_user(
        &self,
        user: UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Order>, StoreError> {
        self.read(|s| {
            let mine = s
                .orders
                .values()
                .rev()
                .filter(|o| o.user_id == user)
                .cloned();
            page(mine, limit, offset)
        })
    }

    fn orders_completed_since(&self, since: DateTime<Utc>) -> Result<Vec<Order>, StoreError> {
        self.read(|s| {
            s.orders
                .values()
                .filter(|o| o.status == OrderStatus::Completed)
                .filter(|o| o.paid_at.is_some_and(|at| at >= since))
                .cloned()
                .collect()
        })
    }

    fn save_order(&self, order: &Order) -> Result<(), StoreError> {
        self.write(StoreOp::SaveOrder(order.clone()))
    }

    fn next_order_id(&self) -> OrderId {
        OrderId(self.next_id(Table::Orders))
    }
}

impl PaymentRepository for Store {
    fn find_payment(&self, id: PaymentId) -> Result<Option<Payment>, StoreError> {
        self.read(|s| s.payments.get(&id).cloned())
    }

    fn find_payment_for_order(&self, order: OrderId) -> Result<Option<Payment>, StoreError> {
        self.read(|s| s.payments.values().find(|p| p.order_id == order).cloned())
    }

    fn save_payment(&self, payment: &Payment) -> Result<(), StoreError> {
        self.write(StoreOp::SavePayment(payment.clone()))
    }

    fn next_payment_id(&self) -> PaymentId {
        PaymentId(self.next_id(Table::Payments))
    }
}

impl EventLogRepository for Store {
    fn find_event_log(&self, id: EventLogId) -> Result<Option<EventLog>, StoreError> {
        self.read(|s| s.event_logs.get(&id).cloned())
    }

    fn failed_events_due(&self, now: DateTime<Utc>) -> Result<Vec<EventLog>, StoreError> {
        self.read(|s| {
            s.event_logs
                .values()
                .filter(|e| e.status == EventStatus::Failed && e.is_due(now))
                .cloned()
                .collect()
        })
    }

    fn save_event_log(&self, log: &EventLog) -> Result<(), StoreError> {
        self.write(StoreOp::SaveEventLog(log.clone()))
    }

    fn next_event_log_id(&self) -> EventLogId {
        EventLogId(self.next_id(Table::EventLogs))
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
