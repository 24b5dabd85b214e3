// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbox: durable record and dispatch of domain events

use crate::error::{EntityKind, ShopError};
use shop_adapters::{EventPort, OutboundEvent};
use shop_core::{Clock, DomainEvent, EventLog, EventLogId, RetryPolicy};
use shop_storage::EventLogRepository;

/// Counts from one retry pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryReport {
    pub attempted: usize,
    pub published: usize,
    pub failed: usize,
}

/// Writes every event to the event log before publishing it
///
/// Nothing here fails the business operation that produced the event:
/// storage and publish errors are logged and left for the retry sweep.
#[derive(Clone)]
pub struct Outbox<E, S, C> {
    events: E,
    store: S,
    clock: C,
    policy: RetryPolicy,
}

impl<E, S, C> Outbox<E, S, C>
where
    E: EventPort,
    S: EventLogRepository + Clone + Send + Sync + 'static,
    C: Clock,
{
    pub fn new(events: E, store: S, clock: C, policy: RetryPolicy) -> Self {
        Self {
            events,
            store,
            clock,
            policy,
        }
    }

    /// Persist `event` as PENDING, then publish it
    ///
    /// Returns the log id, or None when the row could not be written.
    pub async fn record(&self, event: &DomainEvent, correlation_id: &str) -> Option<EventLogId> {
        let id = self.store.next_event_log_id();
        let log = match EventLog::pending(id, event, correlation_id, self.clock.utc_now()) {
            Ok(log) => log,
            Err(e) => {
                tracing::error!(event_type = ?event.event_type(), error = %e, "event not serializable, dropped");
                return None;
            }
        };
        if let Err(e) = self.store.save_event_log(&log) {
            tracing::error!(
                event_log_id = %id,
                event_type = ?log.event_type,
                correlation_id,
                error = %e,
                "failed to record event"
            );
            return None;
        }

        self.dispatch(log).await;
        Some(id)
    }

    /// Publish one PENDING row and store the outcome; true when published
    async fn dispatch(&self, mut log: EventLog) -> bool {
        let topic = log.event_type.topic();
        let result = self.events.publish(topic, &OutboundEvent::from(&log)).await;
        let now = self.clock.utc_now();

        let published = result.is_ok();
        let marked = match result {
            Ok(()) => log.mark_published(format!("stream:{topic}"), now),
            Err(e) => {
                tracing::warn!(event_log_id = %log.id, topic, error = %e, "publish failed, will retry");
                log.mark_failed(e.to_string(), now, &self.policy)
            }
        };
        if let Err(e) = marked {
            tracing::error!(event_log_id = %log.id, error = %e, "event log transition rejected");
            return false;
        }
        if log.is_exhausted() {
            tracing::error!(
                event_log_id = %log.id,
                retries = log.retry_count,
                "event out of retries, needs manual handling"
            );
        }
        if let Err(e) = self.store.save_event_log(&log) {
            tracing::error!(event_log_id = %log.id, error = %e, "failed to store publish outcome");
        }
        published
    }

    /// Re-publish every FAILED row whose retry time has come
    pub async fn retry_due(&self) -> Result<RetryReport, ShopError> {
        let now = self.clock.utc_now();
        let due = self.store.failed_events_due(now)?;
        let mut report = RetryReport::default();

        for mut log in due {
            report.attempted += 1;
            log.begin_retry(now)?;
            if self.dispatch(log).await {
                report.published += 1;
            } else {
                report.failed += 1;
            }
        }

        if report.attempted > 0 {
            tracing::info!(
                attempted = report.attempted,
                published = report.published,
                failed = report.failed,
                "outbox retry pass"
            );
        }
        Ok(report)
    }

    /// Downstream acknowledgement: PUBLISHED becomes COMPLETED
    pub fn complete(&self, id: EventLogId) -> Result<(), ShopError> {
        let mut log = self
            .store
            .find_event_log(id)?
            .ok_or_else(|| ShopError::not_found(EntityKind::EventLog, id.0))?;
        log.mark_completed(self.clock.utc_now())?;
        self.store.save_event_log(&log)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "outbox_tests.rs"]
mod tests;
