// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orders and their line items

use crate::id::{OrderId, ProductId, UserId};
use crate::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Paid,
    Cancelled,
    Completed,
}

impl OrderStatus {
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Paid | Completed | Cancelled) | (Paid, Completed)
        )
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Paid => "PAID",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Completed => "COMPLETED",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OrderError {
    #[error("order has no items")]
    EmptyItems,
    #[error("quantity for product {product_id} must be positive")]
    InvalidQuantity { product_id: ProductId },
    #[error("order {order_id} does not belong to user {user_id}")]
    Unauthorized { order_id: OrderId, user_id: UserId },
    #[error("order {order_id} is already paid")]
    AlreadyPaid { order_id: OrderId },
    #[error("order {order_id} cannot move from {from} to {to}")]
    InvalidStatusTransition {
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    },
}

/// A requested line before prices are known
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl OrderLine {
    pub fn new(product_id: ProductId, quantity: u32) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// Validate requested lines and fold repeated products into one quantity
///
/// The result is keyed and iterated in ascending product order.
pub fn merge_lines(lines: &[OrderLine]) -> Result<BTreeMap<ProductId, u32>, OrderError> {
    if lines.is_empty() {
        return Err(OrderError::EmptyItems);
    }
    let mut merged = BTreeMap::new();
    for line in lines {
        if line.quantity == 0 {
            return Err(OrderError::InvalidQuantity {
                product_id: line.product_id,
            });
        }
        let qty = merged.entry(line.product_id).or_insert(0u32);
        *qty = qty.saturating_add(line.quantity);
    }
    Ok(merged)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
}

impl OrderItem {
    pub fn subtotal(&self) -> Money {
        self.unit_price
            .checked_mul(self.quantity)
            .unwrap_or(Money(u64::MAX))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub total: Money,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn new(
        id: OrderId,
        user_id: UserId,
        items: Vec<OrderItem>,
        now: DateTime<Utc>,
    ) -> Result<Self, OrderError> {
        if items.is_empty() {
            return Err(OrderError::EmptyItems);
        }
        if let Some(item) = items.iter().find(|i| i.quantity == 0) {
            return Err(OrderError::InvalidQuantity {
                product_id: item.product_id,
            });
        }
        let total = items.iter().map(OrderItem::subtotal).sum();
        Ok(Self {
            id,
            user_id,
            items,
            total,
            status: OrderStatus::Pending,
            created_at: now,
            paid_at: None,
        })
    }

    pub fn ensure_owned_by(&self, user: UserId) -> Result<(), OrderError> {
        if self.user_id != user {
            return Err(OrderError::Unauthorized {
                order_id: self.id,
                user_id: user,
            });
        }
        Ok(())
    }

    /// Paid or completed orders cannot be paid again
    pub fn ensure_payable(&self) -> Result<(), OrderError> {
        match self.status {
            OrderStatus::Pending => Ok(()),
            OrderStatus::Paid | OrderStatus::Completed => {
                Err(OrderError::AlreadyPaid { order_id: self.id })
            }
            OrderStatus::Cancelled => Err(OrderError::InvalidStatusTransition {
                order_id: self.id,
                from: self.status,
                to: OrderStatus::Paid,
            }),
        }
    }

    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<(), OrderError> {
        self.transition_to(OrderStatus::Completed)?;
        self.paid_at.get_or_insert(now);
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), OrderError> {
        self.transition_to(OrderStatus::Cancelled)
    }

    fn transition_to(&mut self, next: OrderStatus) -> Result<(), OrderError> {
        if !self.status.can_transition_to(next) {
            return Err(OrderError::InvalidStatusTransition {
                order_id: self.id,
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

#[cfg(test)]
#[path = "order_tests.rs"]
mod tests;
