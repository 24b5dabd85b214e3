// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::cache::FakeCacheBackend;
use crate::event::FakePublisher;
use crate::lock::FakeLockAdapter;
use chrono::Utc;
use shop_core::{DomainEvent, EventLog, EventLogId, Money, ProductId, UserId};
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

/// A writer that captures log output for testing
#[derive(Clone, Default)]
struct CapturedLogs {
    logs: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    fn new() -> Self {
        Self::default()
    }

    fn contents(&self) -> String {
        let logs = self.logs.lock().unwrap();
        String::from_utf8_lossy(&logs).to_string()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.logs.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run a test with captured tracing output
fn with_tracing<F, Fut>(f: F) -> (String, Fut::Output)
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future,
{
    let logs = CapturedLogs::new();
    let logs_clone = logs.clone();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_writer(logs_clone)
        .with_ansi(false)
        .without_time()
        .finish();

    let result = tracing::subscriber::with_default(subscriber, || {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(f())
    });

    (logs.contents(), result)
}

fn outbound() -> OutboundEvent {
    let event = DomainEvent::BalanceCharged {
        user_id: UserId(7),
        amount: Money(500),
        balance: Money(1_500),
    };
    let log = EventLog::pending(EventLogId(3), &event, "corr-9", Utc::now()).unwrap();
    OutboundEvent::from(&log)
}

#[test]
fn traced_lock_logs_span_and_outcome() {
    let fake = FakeLockAdapter::new();
    let key = LockKey::product(ProductId(1));
    fake.deny(key.clone());
    let traced = TracedLock::new(fake);

    let (logs, acquired) = with_tracing(|| async {
        traced.acquire(&key, &HolderId::new("h-1")).await
    });

    assert!(!acquired);
    assert!(logs.contains("lock.acquire"), "logs: {logs}");
    assert!(logs.contains("product:product_1"), "logs: {logs}");
    assert!(logs.contains("not acquired"), "logs: {logs}");
    assert!(logs.contains("elapsed_ms"), "logs: {logs}");
}

#[test]
fn traced_lock_passes_grants_through() {
    let traced = TracedLock::new(FakeLockAdapter::new());
    let key = LockKey::balance(UserId(1));

    let (logs, acquired) = with_tracing(|| async {
        let holder = HolderId::new("h-1");
        let acquired = traced.acquire(&key, &holder).await;
        traced.release(&key, &holder).await;
        acquired
    });

    assert!(acquired);
    assert!(logs.contains("acquired"), "logs: {logs}");
    assert!(logs.contains("released"), "logs: {logs}");
}

#[test]
fn traced_cache_logs_backend_failures() {
    let fake = FakeCacheBackend::new();
    fake.set_failing(true);
    let traced = TracedCacheBackend::new(fake);

    let (logs, result) = with_tracing(|| async { traced.get("cache:balance:info:user_1").await });

    assert!(result.is_err());
    assert!(logs.contains("WARN"), "logs: {logs}");
    assert!(logs.contains("cache get failed"), "logs: {logs}");
}

#[test]
fn traced_cache_pattern_delete_reports_count() {
    let fake = FakeCacheBackend::new();
    fake.insert_raw("cache:order:list:user_7_limit_10_offset_0", "[]");
    fake.insert_raw("cache:order:list:user_8_limit_10_offset_0", "[]");
    let traced = TracedCacheBackend::new(fake.clone());

    let (logs, removed) = with_tracing(|| async {
        traced
            .delete_matching(&KeyPattern::new("cache:order:list:user_7_*"))
            .await
    });

    assert_eq!(removed.unwrap(), 1);
    assert!(logs.contains("cache.delete_matching"), "logs: {logs}");
    assert!(logs.contains("removed=1"), "logs: {logs}");
    assert_eq!(fake.keys().len(), 1);
}

#[test]
fn traced_publish_logs_topic_and_correlation() {
    let traced = TracedEventPort::new(FakePublisher::new());

    let (logs, result) = with_tracing(|| async {
        traced.publish("balance.charged", &outbound()).await
    });

    assert!(result.is_ok());
    assert!(logs.contains("event.publish"), "logs: {logs}");
    assert!(logs.contains("balance.charged"), "logs: {logs}");
    assert!(logs.contains("corr-9"), "logs: {logs}");
    assert!(logs.contains("published"), "logs: {logs}");
}

#[test]
fn traced_publish_logs_failure_at_error() {
    let fake = FakePublisher::new();
    fake.set_failing(true);
    let traced = TracedEventPort::new(fake);

    let (logs, result) = with_tracing(|| async {
        traced.publish("balance.charged", &outbound()).await
    });

    assert!(result.is_err());
    assert!(logs.contains("ERROR"), "logs: {logs}");
    assert!(logs.contains("publish failed"), "logs: {logs}");
}
