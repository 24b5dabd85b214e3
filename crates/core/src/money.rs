// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Monetary amounts and discount rates

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Non-negative amount in minor currency units
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(pub u64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// `None` when the result would be negative
    pub fn checked_sub(self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Money)
    }

    pub fn checked_mul(self, quantity: u32) -> Option<Money> {
        self.0.checked_mul(u64::from(quantity)).map(Money)
    }

    /// Apply a discount, rounding the discounted amount down
    pub fn discounted(self, rate: DiscountRate) -> Money {
        let keep = u128::from(DiscountRate::SCALE - rate.basis_points());
        let amount = u128::from(self.0) * keep / u128::from(DiscountRate::SCALE);
        Money(u64::try_from(amount).unwrap_or(u64::MAX))
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        Money(iter.map(|m| m.0).fold(0u64, u64::saturating_add))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("discount rate out of range: {0} basis points")]
pub struct InvalidDiscountRate(pub u32);

/// Discount rate in basis points (1/100 of a percent)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct DiscountRate(u16);

impl DiscountRate {
    pub const SCALE: u64 = 10_000;

    pub fn from_basis_points(bps: u32) -> Result<Self, InvalidDiscountRate> {
        if u64::from(bps) > Self::SCALE {
            return Err(InvalidDiscountRate(bps));
        }
        u16::try_from(bps)
            .map(Self)
            .map_err(|_| InvalidDiscountRate(bps))
    }

    /// Convenience for whole percentages (`10` is 10%)
    pub fn percent(pct: u8) -> Result<Self, InvalidDiscountRate> {
        Self::from_basis_points(u32::from(pct) * 100)
    }

    pub fn basis_points(self) -> u64 {
        u64::from(self.0)
    }
}

impl TryFrom<u32> for DiscountRate {
    type Error = InvalidDiscountRate;

    fn try_from(bps: u32) -> Result<Self, Self::Error> {
        Self::from_basis_points(bps)
    }
}

impl From<DiscountRate> for u32 {
    fn from(rate: DiscountRate) -> Self {
        u32::from(rate.0)
    }
}
