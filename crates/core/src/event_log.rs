// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Domain events and the outbox record that tracks their dispatch
//!
//! An `EventLog` row is written PENDING before dispatch, then moves to
//! PUBLISHED (and COMPLETED once a consumer acknowledges it) or FAILED with a
//! scheduled retry.

use crate::id::{CouponHistoryId, CouponId, EventLogId, OrderId, PaymentId, UserId};
use crate::money::Money;
use crate::retry::RetryPolicy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    OrderCreated,
    OrderCancelled,
    OrderCompleted,
    PaymentCompleted,
    PaymentFailed,
    BalanceCharged,
    BalanceDeducted,
    CouponIssued,
    CouponExpired,
}

impl EventType {
    /// Stream topic the event is published to
    pub fn topic(self) -> &'static str {
        match self {
            EventType::OrderCreated => "order.created",
            EventType::OrderCancelled => "order.cancelled",
            EventType::OrderCompleted => "order.completed",
            EventType::PaymentCompleted => "data-platform.payment.completed",
            EventType::PaymentFailed => "payment.failed",
            EventType::BalanceCharged => "balance.charged",
            EventType::BalanceDeducted => "balance.deducted",
            EventType::CouponIssued => "coupon.issued",
            EventType::CouponExpired => "coupon.expired",
        }
    }
}

/// A state change worth propagating
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DomainEvent {
    OrderCreated {
        order_id: OrderId,
        user_id: UserId,
        total: Money,
    },
    OrderCancelled {
        order_id: OrderId,
        user_id: UserId,
    },
    OrderCompleted {
        order_id: OrderId,
        user_id: UserId,
    },
    PaymentCompleted {
        payment_id: PaymentId,
        order_id: OrderId,
        user_id: UserId,
        amount: Money,
        coupon_id: Option<CouponId>,
    },
    /// The saga failed after the balance was already deducted
    PaymentFailed {
        order_id: OrderId,
        user_id: UserId,
        deducted: Money,
        reason: String,
    },
    BalanceCharged {
        user_id: UserId,
        amount: Money,
        balance: Money,
    },
    BalanceDeducted {
        user_id: UserId,
        amount: Money,
        balance: Money,
    },
    CouponIssued {
        coupon_id: CouponId,
        user_id: UserId,
        history_id: CouponHistoryId,
    },
    CouponExpired {
        coupon_id: CouponId,
        expired_histories: usize,
    },
}

impl DomainEvent {
    pub fn event_type(&self) -> EventType {
        match self {
            DomainEvent::OrderCreated { .. } => EventType::OrderCreated,
            DomainEvent::OrderCancelled { .. } => EventType::OrderCancelled,
            DomainEvent::OrderCompleted { .. } => EventType::OrderCompleted,
            DomainEvent::PaymentCompleted { .. } => EventType::PaymentCompleted,
            DomainEvent::PaymentFailed { .. } => EventType::PaymentFailed,
            DomainEvent::BalanceCharged { .. } => EventType::BalanceCharged,
            DomainEvent::BalanceDeducted { .. } => EventType::BalanceDeducted,
            DomainEvent::CouponIssued { .. } => EventType::CouponIssued,
            DomainEvent::CouponExpired { .. } => EventType::CouponExpired,
        }
    }

    /// Key that keeps events of one aggregate on one partition
    pub fn partition_key(&self) -> String {
        match self {
            DomainEvent::OrderCreated { order_id, .. }
            | DomainEvent::OrderCancelled { order_id, .. }
            | DomainEvent::OrderCompleted { order_id, .. }
            | DomainEvent::PaymentFailed { order_id, .. } => format!("order:{order_id}"),
            DomainEvent::PaymentCompleted { payment_id, .. } => format!("payment:{payment_id}"),
            DomainEvent::BalanceCharged { user_id, .. }
            | DomainEvent::BalanceDeducted { user_id, .. }
            | DomainEvent::CouponIssued { user_id, .. } => format!("user:{user_id}"),
            DomainEvent::CouponExpired { coupon_id, .. } => format!("coupon:{coupon_id}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    Pending,
    Published,
    Completed,
    Failed,
}

impl EventStatus {
    pub fn can_transition_to(self, next: EventStatus) -> bool {
        use EventStatus::*;
        matches!(
            (self, next),
            (Pending, Published | Failed) | (Published, Completed) | (Failed, Pending)
        )
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EventStatus::Pending => "PENDING",
            EventStatus::Published => "PUBLISHED",
            EventStatus::Completed => "COMPLETED",
            EventStatus::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EventLogError {
    #[error("event {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: EventLogId,
        from: EventStatus,
        to: EventStatus,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    pub id: EventLogId,
    pub event_type: EventType,
    /// Serialized `DomainEvent`
    pub payload: String,
    pub partition_key: String,
    pub status: EventStatus,
    pub retry_count: u32,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub correlation_id: String,
    pub external_endpoint: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventLog {
    pub fn pending(
        id: EventLogId,
        event: &DomainEvent,
        correlation_id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id,
            event_type: event.event_type(),
            payload: serde_json::to_string(event)?,
            partition_key: event.partition_key(),
            status: EventStatus::Pending,
            retry_count: 0,
            next_retry_at: None,
            correlation_id: correlation_id.into(),
            external_endpoint: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn event(&self) -> Result<DomainEvent, serde_json::Error> {
        serde_json::from_str(&self.payload)
    }

    pub fn mark_published(
        &mut self,
        endpoint: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<(), EventLogError> {
        self.transition_to(EventStatus::Published, now)?;
        self.external_endpoint = Some(endpoint.into());
        self.error_message = None;
        self.next_retry_at = None;
        Ok(())
    }

    pub fn mark_completed(&mut self, now: DateTime<Utc>) -> Result<(), EventLogError> {
        self.transition_to(EventStatus::Completed, now)
    }

    /// Record a dispatch failure and schedule the next attempt, if any
    pub fn mark_failed(
        &mut self,
        error: impl Into<String>,
        now: DateTime<Utc>,
        policy: &RetryPolicy,
    ) -> Result<(), EventLogError> {
        self.transition_to(EventStatus::Failed, now)?;
        self.retry_count += 1;
        self.error_message = Some(error.into());
        self.next_retry_at = if policy.should_retry(self.retry_count) {
            let delay = chrono::Duration::from_std(policy.delay_for(self.retry_count))
                .unwrap_or_else(|_| chrono::Duration::zero());
            Some(now + delay)
        } else {
            None
        };
        Ok(())
    }

    /// Put a failed record back to PENDING for another dispatch
    pub fn begin_retry(&mut self, now: DateTime<Utc>) -> Result<(), EventLogError> {
        self.transition_to(EventStatus::Pending, now)
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == EventStatus::Failed && self.next_retry_at.is_some_and(|at| at <= now)
    }

    /// Failed and out of retries
    pub fn is_exhausted(&self) -> bool {
        self.status == EventStatus::Failed && self.next_retry_at.is_none()
    }

    fn transition_to(&mut self, next: EventStatus, now: DateTime<Utc>) -> Result<(), EventLogError> {
        if !self.status.can_transition_to(next) {
            return Err(EventLogError::InvalidTransition {
                id: self.id,
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
#[path = "event_log_tests.rs"]
mod tests;
