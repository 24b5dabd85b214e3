// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized state from WAL replay

use crate::op::{StoreOp, Table};
use shop_core::{
    Balance, Coupon, CouponHistory, CouponHistoryId, CouponId, EventLog, EventLogId, Order,
    OrderId, Payment, PaymentId, Product, ProductId, User, UserId,
};
use std::collections::{BTreeMap, HashMap};

/// Every row the store holds, keyed by id
#[derive(Debug, Default, Clone)]
pub struct MaterializedState {
    pub users: BTreeMap<UserId, User>,
    pub balances: BTreeMap<UserId, Balance>,
    pub products: BTreeMap<ProductId, Product>,
    pub coupons: BTreeMap<CouponId, Coupon>,
    pub coupon_histories: BTreeMap<CouponHistoryId, CouponHistory>,
    pub orders: BTreeMap<OrderId, Order>,
    pub payments: BTreeMap<PaymentId, Payment>,
    pub event_logs: BTreeMap<EventLogId, EventLog>,
    /// Highest id seen or handed out per table
    pub last_ids: HashMap<Table, u64>,
}

impl MaterializedState {
    /// Reserve the next id of a table
    pub fn next_id(&mut self, table: Table) -> u64 {
        let last = self.last_ids.entry(table).or_insert(0);
        *last += 1;
        *last
    }

    fn observe_id(&mut self, table: Table, id: u64) {
        let last = self.last_ids.entry(table).or_insert(0);
        *last = (*last).max(id);
    }

    /// Apply an operation to update the state
    pub fn apply(&mut self, op: &StoreOp) {
        match op {
            StoreOp::SaveUser(user) => {
                self.observe_id(Table::Users, user.id.0);
                self.users.insert(user.id, user.clone());
            }

            // Keyed by user; balances have no id sequence of their own
            StoreOp::SaveBalance(balance) => {
                self.balances.insert(balance.user_id, balance.clone());
            }

            StoreOp::SaveProduct(product) => {
                self.observe_id(Table::Products, product.id.0);
                self.products.insert(product.id, product.clone());
            }

            StoreOp::SaveCoupon(coupon) => {
                self.observe_id(Table::Coupons, coupon.id.0);
                self.coupons.insert(coupon.id, coupon.clone());
            }

            StoreOp::SaveCouponHistory(history) => {
                self.observe_id(Table::CouponHistories, history.id.0);
                self.coupon_histories.insert(history.id, history.clone());
            }

            StoreOp::SaveOrder(order) => {
                self.observe_id(Table::Orders, order.id.0);
                self.orders.insert(order.id, order.clone());
            }

            StoreOp::SavePayment(payment) => {
                self.observe_id(Table::Payments, payment.id.0);
                self.payments.insert(payment.id, payment.clone());
            }

            StoreOp::SaveEventLog(log) => {
                self.observe_id(Table::EventLogs, log.id.0);
                self.event_logs.insert(log.id, log.clone());
            }
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
