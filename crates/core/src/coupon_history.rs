// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-user coupon issuance records
//!
//! ISSUED is the only live state; USED and EXPIRED are terminal.

use crate::id::{CouponHistoryId, CouponId, OrderId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CouponHistoryStatus {
    Issued,
    Used,
    Expired,
}

impl CouponHistoryStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, CouponHistoryStatus::Issued)
    }
}

impl std::fmt::Display for CouponHistoryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CouponHistoryStatus::Issued => "ISSUED",
            CouponHistoryStatus::Used => "USED",
            CouponHistoryStatus::Expired => "EXPIRED",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HistoryError {
    #[error("coupon history {history_id} cannot move from {from} to {to}")]
    InvalidHistoryStatusTransition {
        history_id: CouponHistoryId,
        from: CouponHistoryStatus,
        to: CouponHistoryStatus,
    },
    #[error("coupon {coupon_id} held by history {history_id} has expired")]
    Expired {
        history_id: CouponHistoryId,
        coupon_id: CouponId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponHistory {
    pub id: CouponHistoryId,
    pub user_id: UserId,
    pub coupon_id: CouponId,
    pub status: CouponHistoryStatus,
    pub issued_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub expired_at: Option<DateTime<Utc>>,
    pub order_id: Option<OrderId>,
}

impl CouponHistory {
    pub fn issued(
        id: CouponHistoryId,
        user_id: UserId,
        coupon_id: CouponId,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            coupon_id,
            status: CouponHistoryStatus::Issued,
            issued_at,
            used_at: None,
            expired_at: None,
            order_id: None,
        }
    }

    pub fn is_usable(&self) -> bool {
        self.status == CouponHistoryStatus::Issued
    }

    /// Consume the coupon for `order`
    ///
    /// Expiry is re-checked against the coupon's end date. An expired coupon
    /// moves the record to EXPIRED (the caller must persist it) and returns
    /// `Expired` instead of succeeding.
    pub fn use_coupon(
        &mut self,
        order: OrderId,
        coupon_end_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), HistoryError> {
        self.ensure_issued(CouponHistoryStatus::Used)?;

        if now > coupon_end_at {
            self.status = CouponHistoryStatus::Expired;
            self.expired_at = Some(now);
            return Err(HistoryError::Expired {
                history_id: self.id,
                coupon_id: self.coupon_id,
            });
        }

        self.status = CouponHistoryStatus::Used;
        self.used_at = Some(now);
        self.order_id = Some(order);
        Ok(())
    }

    pub fn expire(&mut self, now: DateTime<Utc>) -> Result<(), HistoryError> {
        self.ensure_issued(CouponHistoryStatus::Expired)?;
        self.status = CouponHistoryStatus::Expired;
        self.expired_at = Some(now);
        Ok(())
    }

    fn ensure_issued(&self, to: CouponHistoryStatus) -> Result<(), HistoryError> {
        if self.status != CouponHistoryStatus::Issued {
            return Err(HistoryError::InvalidHistoryStatusTransition {
                history_id: self.id,
                from: self.status,
                to,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use yare::parameterized;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap()
    }

    fn history() -> CouponHistory {
        CouponHistory::issued(CouponHistoryId(1), UserId(2), CouponId(3), now())
    }

    #[test]
    fn use_within_window_marks_used() {
        let mut h = history();
        h.use_coupon(OrderId(9), now() + Duration::hours(1), now())
            .unwrap();

        assert_eq!(h.status, CouponHistoryStatus::Used);
        assert_eq!(h.used_at, Some(now()));
        assert_eq!(h.order_id, Some(OrderId(9)));
    }

    #[test]
    fn use_after_coupon_end_expires_the_record() {
        let mut h = history();
        let err = h
            .use_coupon(OrderId(9), now() - Duration::hours(1), now())
            .unwrap_err();

        assert!(matches!(err, HistoryError::Expired { .. }));
        assert_eq!(h.status, CouponHistoryStatus::Expired);
        assert_eq!(h.order_id, None);
    }

    #[parameterized(
        used_cannot_be_used = { CouponHistoryStatus::Used },
        expired_cannot_be_used = { CouponHistoryStatus::Expired },
    )]
    fn terminal_states_reject_use(status: CouponHistoryStatus) {
        let mut h = history();
        h.status = status;

        let err = h
            .use_coupon(OrderId(9), now() + Duration::hours(1), now())
            .unwrap_err();

        assert_eq!(
            err,
            HistoryError::InvalidHistoryStatusTransition {
                history_id: CouponHistoryId(1),
                from: status,
                to: CouponHistoryStatus::Used,
            }
        );
        assert!(status.is_terminal());
    }

    #[test]
    fn expire_only_from_issued() {
        let mut h = history();
        h.expire(now()).unwrap();
        assert_eq!(h.expired_at, Some(now()));
        assert!(h.expire(now()).is_err());
    }
}
