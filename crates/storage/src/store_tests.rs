// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::{Duration, TimeZone};
use shop_core::{DiscountRate, DomainEvent, Money, OrderItem, RetryPolicy};

fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, hour, 0, 0).unwrap()
}

fn coupon(id: u64, end: DateTime<Utc>) -> Coupon {
    Coupon::new(
        CouponId(id),
        format!("C{id}"),
        "spring sale",
        DiscountRate::percent(10).unwrap(),
        100,
        at(0),
        end,
        at(1),
    )
}

fn order(id: u64, user: u64) -> Order {
    Order::new(
        OrderId(id),
        UserId(user),
        vec![OrderItem {
            product_id: ProductId(1),
            quantity: 1,
            unit_price: Money(1_000),
        }],
        at(2),
    )
    .unwrap()
}

#[test]
fn reopened_store_reproduces_saved_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shop.wal");

    {
        let store = Store::open(&path).unwrap();
        store.save_user(&User::new(UserId(1), "ada")).unwrap();
        let mut product = Product::new(ProductId(1), "lamp", Money(1_000), 5);
        store.save_product(&product).unwrap();
        product.reserve(2).unwrap();
        store.save_product(&product).unwrap();
        store.save_order(&order(1, 1)).unwrap();
        assert_eq!(store.wal_sequence(), 4);
    }

    let store = Store::open(&path).unwrap();
    assert!(store.user_exists(UserId(1)).unwrap());
    assert_eq!(
        store.find_product(ProductId(1)).unwrap().unwrap().reserved_stock,
        2
    );
    assert_eq!(store.find_order(OrderId(1)).unwrap(), Some(order(1, 1)));
    assert_eq!(store.next_order_id(), OrderId(2));
}

#[test]
fn injected_failure_leaves_state_untouched() {
    let store = Store::in_memory();
    store.inject_failure(Table::Products);

    let err = store
        .save_product(&Product::new(ProductId(1), "lamp", Money(1_000), 5))
        .unwrap_err();

    assert!(matches!(err, StoreError::Injected { table: Table::Products }));
    assert!(store.find_product(ProductId(1)).unwrap().is_none());

    store.clear_failures();
    store
        .save_product(&Product::new(ProductId(1), "lamp", Money(1_000), 5))
        .unwrap();
    assert!(store.find_product(ProductId(1)).unwrap().is_some());
}

#[test]
fn orders_by_user_are_newest_first_and_paged() {
    let store = Store::in_memory();
    for id in 1..=5 {
        store.save_order(&order(id, 1)).unwrap();
    }
    store.save_order(&order(6, 2)).unwrap();

    let ids = |orders: Vec<Order>| orders.into_iter().map(|o| o.id.0).collect::<Vec<_>>();
    assert_eq!(ids(store.orders_by_user(UserId(1), 2, 0).unwrap()), vec![5, 4]);
    assert_eq!(ids(store.orders_by_user(UserId(1), 2, 4).unwrap()), vec![1]);
    assert_eq!(ids(store.orders_by_user(UserId(2), 10, 0).unwrap()), vec![6]);
}

#[test]
fn completed_orders_are_filtered_by_payment_time() {
    let store = Store::in_memory();
    let mut early = order(1, 1);
    early.complete(at(3)).unwrap();
    let mut late = order(2, 1);
    late.complete(at(8)).unwrap();
    store.save_order(&early).unwrap();
    store.save_order(&late).unwrap();
    store.save_order(&order(3, 1)).unwrap();

    let found = store.orders_completed_since(at(5)).unwrap();
    assert_eq!(found, vec![late]);
}

#[test]
fn product_pages_follow_id_order() {
    let store = Store::in_memory();
    for id in [3, 1, 2] {
        store
            .save_product(&Product::new(ProductId(id), "lamp", Money(1_000), 1))
            .unwrap();
    }

    let ids: Vec<u64> = store
        .products(2, 1)
        .unwrap()
        .into_iter()
        .map(|p| p.id.0)
        .collect();
    assert_eq!(ids, vec![2, 3]);
}

#[test]
fn history_lookup_by_user_and_coupon() {
    let store = Store::in_memory();
    let history = CouponHistory::issued(CouponHistoryId(1), UserId(1), CouponId(9), at(3));
    store.save_history(&history).unwrap();

    assert_eq!(
        store.find_history_for(UserId(1), CouponId(9)).unwrap(),
        Some(history)
    );
    assert!(store.find_history_for(UserId(2), CouponId(9)).unwrap().is_none());
    assert_eq!(store.histories_by_coupon(CouponId(9)).unwrap().len(), 1);
}

#[test]
fn coupons_past_end_skips_already_expired() {
    let store = Store::in_memory();
    store.save_coupon(&coupon(1, at(5))).unwrap();
    store.save_coupon(&coupon(2, at(20))).unwrap();
    let mut done = coupon(3, at(5));
    done.expire().unwrap();
    store.save_coupon(&done).unwrap();

    let due: Vec<CouponId> = store
        .coupons_past_end(at(6))
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(due, vec![CouponId(1)]);
}

#[test]
fn failed_events_due_respects_retry_time() {
    let store = Store::in_memory();
    let event = DomainEvent::OrderCancelled {
        order_id: OrderId(1),
        user_id: UserId(1),
    };
    let policy = RetryPolicy::default();
    let mut log = EventLog::pending(EventLogId(1), &event, "corr", at(1)).unwrap();
    log.mark_failed("stream down", at(1), &policy).unwrap();
    store.save_event_log(&log).unwrap();

    assert!(store.failed_events_due(at(1)).unwrap().is_empty());
    let later = at(1) + Duration::seconds(1);
    assert_eq!(store.failed_events_due(later).unwrap().len(), 1);
}

#[test]
fn next_ids_are_unique_across_clones() {
    let store = Store::in_memory();
    let other = store.clone();

    let a = store.next_payment_id();
    let b = other.next_payment_id();
    assert_ne!(a, b);
}
