// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use shop_core::{Money, OrderId, ProductId, UserId};
use yare::parameterized;

#[parameterized(
    conflict = {
        ShopError::ConcurrencyConflict { key: LockKey::balance(UserId(1)) },
        ErrorKind::Conflict
    },
    missing = { ShopError::not_found(EntityKind::Order, 4), ErrorKind::NotFound },
    zero_charge = {
        ShopError::from(BalanceError::InvalidAmount { amount: Money::ZERO }),
        ErrorKind::InvalidInput
    },
    bad_period = {
        ShopError::InvalidArgument { name: "period_days", reason: "must be positive".into() },
        ErrorKind::InvalidInput
    },
    empty_order = { ShopError::from(OrderError::EmptyItems), ErrorKind::InvalidInput },
    foreign_order = {
        ShopError::from(OrderError::Unauthorized { order_id: OrderId(1), user_id: UserId(2) }),
        ErrorKind::Unauthorized
    },
    sold_out = {
        ShopError::from(InventoryError::OutOfStock {
            product_id: ProductId(1),
            requested: 2,
            available: 1,
        }),
        ErrorKind::Rejected
    },
    broken_reservation = {
        ShopError::from(InventoryError::InvalidReservation {
            product_id: ProductId(1),
            requested: 2,
            reserved: 1,
            stock: 1,
        }),
        ErrorKind::Internal
    },
)]
fn error_kind_classifies(error: ShopError, kind: ErrorKind) {
    assert_eq!(error.kind(), kind);
}

#[test]
fn not_found_message_names_entity() {
    let err = ShopError::not_found(EntityKind::CouponHistory, 9);
    assert_eq!(err.to_string(), "coupon history 9 not found");
}

#[test]
fn conflict_message_names_key() {
    let err = ShopError::ConcurrencyConflict {
        key: LockKey::product(ProductId(3)),
    };
    assert!(err.is_conflict());
    assert!(err.to_string().contains("product:product_3"));
}
