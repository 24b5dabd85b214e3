// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn item(product: u64, quantity: u32, price: u64) -> OrderItem {
    OrderItem {
        product_id: ProductId(product),
        quantity,
        unit_price: Money(price),
    }
}

fn order() -> Order {
    Order::new(
        OrderId(1),
        UserId(7),
        vec![item(1, 2, 1_000), item(2, 1, 500)],
        Utc::now(),
    )
    .unwrap()
}

#[test]
fn total_is_sum_of_line_subtotals() {
    let o = order();
    assert_eq!(o.total, Money(2_500));
    assert_eq!(o.status, OrderStatus::Pending);
}

#[test]
fn empty_order_is_rejected() {
    assert_eq!(
        Order::new(OrderId(1), UserId(7), vec![], Utc::now()),
        Err(OrderError::EmptyItems)
    );
}

#[test]
fn merge_lines_folds_duplicates_in_product_order() {
    let merged = merge_lines(&[
        OrderLine::new(ProductId(5), 1),
        OrderLine::new(ProductId(2), 3),
        OrderLine::new(ProductId(5), 2),
    ])
    .unwrap();

    let lines: Vec<_> = merged.into_iter().collect();
    assert_eq!(lines, vec![(ProductId(2), 3), (ProductId(5), 3)]);
}

#[parameterized(
    no_lines = { vec![], OrderError::EmptyItems },
    zero_quantity = {
        vec![OrderLine::new(ProductId(3), 0)],
        OrderError::InvalidQuantity { product_id: ProductId(3) }
    },
)]
fn merge_lines_rejects(lines: Vec<OrderLine>, expected: OrderError) {
    assert_eq!(merge_lines(&lines), Err(expected));
}

#[test]
fn foreign_user_is_unauthorized() {
    assert_eq!(
        order().ensure_owned_by(UserId(8)),
        Err(OrderError::Unauthorized {
            order_id: OrderId(1),
            user_id: UserId(8),
        })
    );
    assert!(order().ensure_owned_by(UserId(7)).is_ok());
}

#[parameterized(
    pending = { OrderStatus::Pending, None },
    paid = { OrderStatus::Paid, Some(OrderError::AlreadyPaid { order_id: OrderId(1) }) },
    completed = { OrderStatus::Completed, Some(OrderError::AlreadyPaid { order_id: OrderId(1) }) },
    cancelled = {
        OrderStatus::Cancelled,
        Some(OrderError::InvalidStatusTransition {
            order_id: OrderId(1),
            from: OrderStatus::Cancelled,
            to: OrderStatus::Paid,
        })
    },
)]
fn payability(status: OrderStatus, expected: Option<OrderError>) {
    let mut o = order();
    o.status = status;
    assert_eq!(o.ensure_payable().err(), expected);
}

#[test]
fn complete_stamps_paid_at_and_is_final() {
    let now = Utc::now();
    let mut o = order();
    o.complete(now).unwrap();

    assert_eq!(o.status, OrderStatus::Completed);
    assert_eq!(o.paid_at, Some(now));
    assert!(o.cancel().is_err());
}
