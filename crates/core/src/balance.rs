// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Account balances

use crate::id::UserId;
use crate::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BalanceError {
    #[error("amount must be positive, got {amount}")]
    InvalidAmount { amount: Money },
    #[error("user {user_id} has {balance}, cannot deduct {requested}")]
    InsufficientBalance {
        user_id: UserId,
        balance: Money,
        requested: Money,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub user_id: UserId,
    pub amount: Money,
    pub updated_at: DateTime<Utc>,
}

impl Balance {
    pub fn empty(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            amount: Money::ZERO,
            updated_at: now,
        }
    }

    pub fn charge(&mut self, amount: Money, now: DateTime<Utc>) -> Result<(), BalanceError> {
        if amount.is_zero() {
            return Err(BalanceError::InvalidAmount { amount });
        }
        self.amount = self
            .amount
            .checked_add(amount)
            .ok_or(BalanceError::InvalidAmount { amount })?;
        self.updated_at = now;
        Ok(())
    }

    pub fn deduct(&mut self, amount: Money, now: DateTime<Utc>) -> Result<(), BalanceError> {
        if amount.is_zero() {
            return Err(BalanceError::InvalidAmount { amount });
        }
        self.amount =
            self.amount
                .checked_sub(amount)
                .ok_or(BalanceError::InsufficientBalance {
                    user_id: self.user_id,
                    balance: self.amount,
                    requested: amount,
                })?;
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[test]
    fn charge_then_deduct() {
        let now = Utc::now();
        let mut b = Balance::empty(UserId(1), now);
        b.charge(Money(10_000), now).unwrap();
        b.deduct(Money(2_500), now).unwrap();
        assert_eq!(b.amount, Money(7_500));
    }

    #[test]
    fn deduct_more_than_balance_is_rejected_and_leaves_amount() {
        let now = Utc::now();
        let mut b = Balance::empty(UserId(1), now);
        b.charge(Money(100), now).unwrap();

        let err = b.deduct(Money(101), now).unwrap_err();

        assert_eq!(
            err,
            BalanceError::InsufficientBalance {
                user_id: UserId(1),
                balance: Money(100),
                requested: Money(101),
            }
        );
        assert_eq!(b.amount, Money(100));
    }

    #[parameterized(
        charge_zero = { true },
        deduct_zero = { false },
    )]
    fn zero_amounts_are_invalid(charge: bool) {
        let now = Utc::now();
        let mut b = Balance::empty(UserId(1), now);
        let result = if charge {
            b.charge(Money::ZERO, now)
        } else {
            b.deduct(Money::ZERO, now)
        };
        assert_eq!(result, Err(BalanceError::InvalidAmount { amount: Money::ZERO }));
    }
}
