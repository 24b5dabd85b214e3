// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable store operations

use serde::{Deserialize, Serialize};
use shop_core::{Balance, Coupon, CouponHistory, EventLog, Order, Payment, Product, User};

/// Entity tables in the store
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Users,
    Balances,
    Products,
    Coupons,
    CouponHistories,
    Orders,
    Payments,
    EventLogs,
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Table::Users => "users",
            Table::Balances => "balances",
            Table::Products => "products",
            Table::Coupons => "coupons",
            Table::CouponHistories => "coupon_histories",
            Table::Orders => "orders",
            Table::Payments => "payments",
            Table::EventLogs => "event_logs",
        };
        f.write_str(name)
    }
}

/// One write to the store, as recorded in the WAL
///
/// Every write is a full-row upsert, so replaying the log in order always
/// ends at the last saved version of each row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "row", rename_all = "snake_case")]
pub enum StoreOp {
    SaveUser(User),
    SaveBalance(Balance),
    SaveProduct(Product),
    SaveCoupon(Coupon),
    SaveCouponHistory(CouponHistory),
    SaveOrder(Order),
    SavePayment(Payment),
    SaveEventLog(EventLog),
}

impl StoreOp {
    pub fn table(&self) -> Table {
        match self {
            StoreOp::SaveUser(_) => Table::Users,
            StoreOp::SaveBalance(_) => Table::Balances,
            StoreOp::SaveProduct(_) => Table::Products,
            StoreOp::SaveCoupon(_) => Table::Coupons,
            StoreOp::SaveCouponHistory(_) => Table::CouponHistories,
            StoreOp::SaveOrder(_) => Table::Orders,
            StoreOp::SavePayment(_) => Table::Payments,
            StoreOp::SaveEventLog(_) => Table::EventLogs,
        }
    }
}
