// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Limited-issuance coupons
//!
//! `issued_count` is a bounded counter: it only grows, one unit per issuance,
//! and never passes `max_issuance`. Issuance must be validated and applied
//! under the coupon's lock.

use crate::id::{CouponId, UserId};
use crate::money::DiscountRate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coupon lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CouponStatus {
    Inactive,
    Active,
    SoldOut,
    Expired,
    Disabled,
}

impl CouponStatus {
    pub fn can_transition_to(self, next: CouponStatus) -> bool {
        use CouponStatus::*;
        matches!(
            (self, next),
            (Inactive, Active | Expired | Disabled)
                | (Active, SoldOut | Expired | Disabled)
                | (SoldOut, Expired | Disabled)
                | (Expired, Disabled)
                | (Disabled, Active)
        )
    }
}

impl std::fmt::Display for CouponStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CouponStatus::Inactive => "INACTIVE",
            CouponStatus::Active => "ACTIVE",
            CouponStatus::SoldOut => "SOLD_OUT",
            CouponStatus::Expired => "EXPIRED",
            CouponStatus::Disabled => "DISABLED",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CouponError {
    #[error("coupon {coupon_id} is not issuable until {start_at}")]
    NotYetStarted {
        coupon_id: CouponId,
        start_at: DateTime<Utc>,
    },
    #[error("coupon {coupon_id} expired at {end_at}")]
    Expired {
        coupon_id: CouponId,
        end_at: DateTime<Utc>,
    },
    #[error("coupon {coupon_id} cannot be issued while {status}")]
    NotIssuable {
        coupon_id: CouponId,
        status: CouponStatus,
    },
    #[error("coupon {coupon_id} is out of stock ({max_issuance} issued)")]
    OutOfStock {
        coupon_id: CouponId,
        max_issuance: u32,
    },
    #[error("coupon {coupon_id} already issued to user {user_id}")]
    AlreadyIssued { coupon_id: CouponId, user_id: UserId },
    #[error("coupon {coupon_id} cannot move from {from} to {to}")]
    InvalidStatusTransition {
        coupon_id: CouponId,
        from: CouponStatus,
        to: CouponStatus,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    pub id: CouponId,
    pub code: String,
    pub name: String,
    pub discount_rate: DiscountRate,
    pub max_issuance: u32,
    pub issued_count: u32,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub status: CouponStatus,
}

impl Coupon {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: CouponId,
        code: impl Into<String>,
        name: impl Into<String>,
        discount_rate: DiscountRate,
        max_issuance: u32,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut coupon = Self {
            id,
            code: code.into(),
            name: name.into(),
            discount_rate,
            max_issuance,
            issued_count: 0,
            start_at,
            end_at,
            status: CouponStatus::Inactive,
        };
        coupon.status = coupon.calculate_status(now);
        coupon
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.end_at
    }

    pub fn remaining(&self) -> u32 {
        self.max_issuance.saturating_sub(self.issued_count)
    }

    /// Status implied by the validity window and the counter
    pub fn calculate_status(&self, now: DateTime<Utc>) -> CouponStatus {
        if self.status == CouponStatus::Disabled {
            CouponStatus::Disabled
        } else if self.is_expired_at(now) {
            CouponStatus::Expired
        } else if self.issued_count >= self.max_issuance {
            CouponStatus::SoldOut
        } else if now < self.start_at {
            CouponStatus::Inactive
        } else {
            CouponStatus::Active
        }
    }

    /// Validate an issuance at `now` without applying it
    ///
    /// Checks run in a fixed order: window start, window end, disabled, quota.
    pub fn check_issuable(&self, now: DateTime<Utc>) -> Result<(), CouponError> {
        if now < self.start_at {
            return Err(CouponError::NotYetStarted {
                coupon_id: self.id,
                start_at: self.start_at,
            });
        }
        if self.is_expired_at(now) {
            return Err(CouponError::Expired {
                coupon_id: self.id,
                end_at: self.end_at,
            });
        }
        if self.status == CouponStatus::Disabled {
            return Err(CouponError::NotIssuable {
                coupon_id: self.id,
                status: self.status,
            });
        }
        if self.issued_count >= self.max_issuance {
            return Err(CouponError::OutOfStock {
                coupon_id: self.id,
                max_issuance: self.max_issuance,
            });
        }
        Ok(())
    }

    /// Take one unit of the quota
    pub fn issue(&mut self, now: DateTime<Utc>) -> Result<(), CouponError> {
        self.check_issuable(now)?;
        self.issued_count += 1;
        self.status = self.calculate_status(now);
        Ok(())
    }

    pub fn transition_to(&mut self, next: CouponStatus) -> Result<(), CouponError> {
        if !self.status.can_transition_to(next) {
            return Err(CouponError::InvalidStatusTransition {
                coupon_id: self.id,
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    pub fn disable(&mut self) -> Result<(), CouponError> {
        self.transition_to(CouponStatus::Disabled)
    }

    pub fn expire(&mut self) -> Result<(), CouponError> {
        self.transition_to(CouponStatus::Expired)
    }

    /// Activate an inactive or disabled coupon
    ///
    /// The resulting status is re-derived from the window and the counter, so
    /// re-enabling an exhausted coupon lands on SOLD_OUT, not ACTIVE.
    pub fn activate(&mut self, now: DateTime<Utc>) -> Result<(), CouponError> {
        self.transition_to(CouponStatus::Active)?;
        self.status = self.calculate_status(now);
        Ok(())
    }
}

#[cfg(test)]
#[path = "coupon_tests.rs"]
mod tests;
