// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use shop_adapters::FakePublisher;
use shop_core::{EventStatus, EventType, FakeClock, Money, UserId};
use shop_storage::{Store, Table};
use std::time::Duration;

fn charged() -> DomainEvent {
    DomainEvent::BalanceCharged {
        user_id: UserId(1),
        amount: Money(500),
        balance: Money(500),
    }
}

fn setup() -> (Outbox<FakePublisher, Store, FakeClock>, FakePublisher, Store, FakeClock) {
    let publisher = FakePublisher::new();
    let store = Store::in_memory();
    let clock = FakeClock::new();
    let policy = RetryPolicy::default()
        .with_initial_delay(Duration::from_secs(1))
        .with_max_retries(3);
    let outbox = Outbox::new(publisher.clone(), store.clone(), clock.clone(), policy);
    (outbox, publisher, store, clock)
}

#[tokio::test]
async fn record_publishes_and_marks_published() {
    let (outbox, publisher, store, _) = setup();

    let id = outbox.record(&charged(), "corr-1").await.unwrap();

    let log = store.find_event_log(id).unwrap().unwrap();
    assert_eq!(log.status, EventStatus::Published);
    assert_eq!(log.external_endpoint.as_deref(), Some("stream:balance.charged"));
    assert_eq!(log.correlation_id, "corr-1");

    let calls = publisher.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].topic, "balance.charged");
    assert_eq!(calls[0].event.key, "user:1");
}

#[tokio::test]
async fn publish_failure_schedules_retry() {
    let (outbox, publisher, store, clock) = setup();
    publisher.set_failing(true);

    let id = outbox.record(&charged(), "corr-1").await.unwrap();

    let log = store.find_event_log(id).unwrap().unwrap();
    assert_eq!(log.status, EventStatus::Failed);
    assert_eq!(log.retry_count, 1);
    assert_eq!(
        log.next_retry_at,
        Some(clock.utc_now() + chrono::Duration::seconds(1))
    );
    assert!(log.error_message.unwrap().contains("injected failure"));
}

#[tokio::test]
async fn retry_due_waits_for_schedule_then_publishes() {
    let (outbox, publisher, store, clock) = setup();
    publisher.set_failing(true);
    let id = outbox.record(&charged(), "corr-1").await.unwrap();
    publisher.set_failing(false);

    let early = outbox.retry_due().await.unwrap();
    assert_eq!(early.attempted, 0);

    clock.advance(Duration::from_secs(1));
    let report = outbox.retry_due().await.unwrap();
    assert_eq!(
        report,
        RetryReport {
            attempted: 1,
            published: 1,
            failed: 0
        }
    );

    let log = store.find_event_log(id).unwrap().unwrap();
    assert_eq!(log.status, EventStatus::Published);
    assert_eq!(publisher.published_types(), vec![EventType::BalanceCharged]);
}

#[tokio::test]
async fn retries_stop_after_max_retries() {
    let (outbox, publisher, store, clock) = setup();
    publisher.set_failing(true);
    let id = outbox.record(&charged(), "corr-1").await.unwrap();

    for _ in 0..5 {
        clock.advance(Duration::from_secs(60));
        outbox.retry_due().await.unwrap();
    }

    let log = store.find_event_log(id).unwrap().unwrap();
    assert_eq!(log.retry_count, 3);
    assert!(log.is_exhausted());
    // first attempt + two retries
    assert_eq!(publisher.calls().len(), 3);
}

#[tokio::test]
async fn storage_failure_never_fails_the_caller() {
    let (outbox, publisher, store, _) = setup();
    store.inject_failure(Table::EventLogs);

    assert!(outbox.record(&charged(), "corr-1").await.is_none());
    assert!(publisher.calls().is_empty());
}

#[tokio::test]
async fn complete_moves_published_to_completed() {
    let (outbox, _, store, _) = setup();
    let id = outbox.record(&charged(), "corr-1").await.unwrap();

    outbox.complete(id).unwrap();

    let log = store.find_event_log(id).unwrap().unwrap();
    assert_eq!(log.status, EventStatus::Completed);
    assert!(matches!(outbox.complete(id), Err(ShopError::EventLog(_))));
}

#[tokio::test]
async fn complete_unknown_event_is_not_found() {
    let (outbox, _, _, _) = setup();
    assert!(matches!(
        outbox.complete(EventLogId(99)),
        Err(ShopError::NotFound {
            entity: EntityKind::EventLog,
            id: 99
        })
    ));
}
