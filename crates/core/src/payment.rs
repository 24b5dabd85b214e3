// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Payment records, one per successfully paid order

use crate::id::{CouponId, OrderId, PaymentId, UserId};
use crate::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Paid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub user_id: UserId,
    /// Amount charged after any discount
    pub amount: Money,
    pub original_amount: Money,
    pub coupon_id: Option<CouponId>,
    pub status: PaymentStatus,
    pub paid_at: DateTime<Utc>,
}

impl Payment {
    pub fn paid(
        id: PaymentId,
        order_id: OrderId,
        user_id: UserId,
        amount: Money,
        original_amount: Money,
        coupon_id: Option<CouponId>,
        paid_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            order_id,
            user_id,
            amount,
            original_amount,
            coupon_id,
            status: PaymentStatus::Paid,
            paid_at,
        }
    }

    pub fn discount(&self) -> Money {
        self.original_amount
            .checked_sub(self.amount)
            .unwrap_or(Money::ZERO)
    }
}
