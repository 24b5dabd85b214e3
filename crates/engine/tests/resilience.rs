// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

//! Cache and event stream outages never fail a business operation

mod common;

use common::harness;
use shop_core::{EventStatus, EventType, Money, OrderLine, OrderStatus};
use shop_engine::RetryReport;
use shop_storage::EventLogRepository;
use std::time::Duration;

// =============================================================================
// Cache outage
// =============================================================================

#[tokio::test]
async fn every_operation_survives_a_dead_cache() {
    let h = harness();
    let user = h.user(1);
    let lamp = h.product(1, 1_000, 10);
    let coupon = h.coupon(1, 10, 5);
    h.cache.set_failing(true);

    h.shop.charge_balance(user, Money(5_000)).await.unwrap();
    assert_eq!(h.shop.get_balance(user).await.unwrap().amount, Money(5_000));

    h.shop.issue_coupon(user, coupon).await.unwrap();
    assert_eq!(h.shop.get_coupon_list(user, 10, 0).await.unwrap().len(), 1);

    let order = h
        .shop
        .create_order(user, &[OrderLine::new(lamp, 2)])
        .await
        .unwrap();
    assert_eq!(h.shop.get_product(lamp).await.unwrap().reserved_stock, 2);
    assert_eq!(h.shop.list_orders(user, 10, 0).await.unwrap(), vec![order.clone()]);

    let payment = h.shop.pay_order(user, order.id, Some(coupon)).await.unwrap();
    assert_eq!(payment.amount, Money(1_800));
    assert_eq!(
        h.shop.get_order(user, order.id).await.unwrap().status,
        OrderStatus::Completed
    );

    h.shop.expire_coupons().await.unwrap();
    assert!(h.cache.keys().is_empty());
}

#[tokio::test]
async fn unreadable_cache_entry_falls_back_to_the_store() {
    let h = harness();
    let user = h.user(1);
    h.shop.charge_balance(user, Money(700)).await.unwrap();
    h.cache
        .insert_raw(&format!("cache:balance:info:user_{user}"), "not json");

    assert_eq!(h.shop.get_balance(user).await.unwrap().amount, Money(700));
}

#[tokio::test]
async fn cached_reads_skip_the_store_until_evicted() {
    let h = harness();
    let user = h.user(1);
    h.shop.charge_balance(user, Money(700)).await.unwrap();
    h.shop.get_balance(user).await.unwrap();

    // A write behind the engine's back stays invisible while cached
    let mut stale = h.shop.get_balance(user).await.unwrap();
    stale.amount = Money(1);
    shop_storage::BalanceRepository::save_balance(&h.store, &stale).unwrap();
    assert_eq!(h.shop.get_balance(user).await.unwrap().amount, Money(700));

    h.shop.charge_balance(user, Money(10)).await.unwrap();
    assert_eq!(h.shop.get_balance(user).await.unwrap().amount, Money(11));
}

// =============================================================================
// Event stream outage
// =============================================================================

#[tokio::test]
async fn publish_failure_leaves_a_failed_row_and_the_operation_succeeds() {
    let h = harness();
    let user = h.user(1);
    h.events.set_failing(true);

    let balance = h.shop.charge_balance(user, Money(500)).await.unwrap();
    assert_eq!(balance.amount, Money(500));

    let logs: Vec<_> = h.store.snapshot().event_logs.into_values().collect();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].event_type, EventType::BalanceCharged);
    assert_eq!(logs[0].status, EventStatus::Failed);
    assert_eq!(logs[0].retry_count, 1);
    assert!(logs[0].next_retry_at.unwrap() > common::noon());
}

#[tokio::test]
async fn failed_events_are_republished_once_due() {
    let h = harness();
    let user = h.user(1);
    h.events.set_failing(true);
    h.shop.charge_balance(user, Money(500)).await.unwrap();
    h.events.set_failing(false);

    assert_eq!(h.shop.retry_failed_events().await.unwrap().attempted, 0);

    h.clock.advance(Duration::from_secs(3600));
    let report = h.shop.retry_failed_events().await.unwrap();

    assert_eq!(
        report,
        RetryReport {
            attempted: 1,
            published: 1,
            failed: 0
        }
    );
    let log = h.store.snapshot().event_logs.into_values().next().unwrap();
    assert_eq!(log.status, EventStatus::Published);
    assert_eq!(log.external_endpoint.as_deref(), Some("stream:balance.charged"));
}

#[tokio::test]
async fn consumer_acknowledgement_completes_the_event() {
    let h = harness();
    let user = h.user(1);
    h.shop.charge_balance(user, Money(500)).await.unwrap();
    let id = h.events.published()[0].event_log_id;

    h.shop.complete_event(id).unwrap();

    let log = h.store.find_event_log(id).unwrap().unwrap();
    assert_eq!(log.status, EventStatus::Completed);
    assert!(h.shop.complete_event(id).is_err(), "already completed");
}

#[tokio::test]
async fn events_of_one_call_share_a_correlation_id() {
    let h = harness();
    let user = h.user(1);
    h.shop.charge_balance(user, Money(50_000)).await.unwrap();
    let lamp = h.product(1, 1_000, 10);
    let order = h
        .shop
        .create_order(user, &[OrderLine::new(lamp, 1)])
        .await
        .unwrap();
    h.shop.pay_order(user, order.id, None).await.unwrap();

    let events = h.events.published();
    let correlation = |t: EventType| {
        events
            .iter()
            .find(|e| e.event_type == t)
            .map(|e| e.correlation_id.clone())
            .unwrap()
    };
    let paid = correlation(EventType::PaymentCompleted);
    assert_eq!(correlation(EventType::BalanceDeducted), paid);
    assert_eq!(correlation(EventType::OrderCompleted), paid);
    assert_ne!(correlation(EventType::OrderCreated), paid);
    assert_eq!(events.last().unwrap().key, "payment:1");
}
