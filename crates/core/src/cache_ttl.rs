// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cache lifetimes per entry kind

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// TTLs for each kind of cached read model
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheTtl {
    #[serde(with = "humantime_serde")]
    pub product_detail: Duration,
    #[serde(with = "humantime_serde")]
    pub product_list: Duration,
    #[serde(with = "humantime_serde")]
    pub order_detail: Duration,
    #[serde(with = "humantime_serde")]
    pub order_list: Duration,
    #[serde(with = "humantime_serde")]
    pub user_balance: Duration,
    #[serde(with = "humantime_serde")]
    pub user_coupon_list: Duration,
    #[serde(with = "humantime_serde")]
    pub coupon_info: Duration,
}

impl Default for CacheTtl {
    fn default() -> Self {
        Self {
            product_detail: Duration::from_secs(3600),
            product_list: Duration::from_secs(3600),
            order_detail: Duration::from_secs(600),
            order_list: Duration::from_secs(300),
            user_balance: Duration::from_secs(60),
            user_coupon_list: Duration::from_secs(300),
            coupon_info: Duration::from_secs(300),
        }
    }
}

impl CacheTtl {
    /// Lifetime of a popular-products ranking computed over `period_days`
    ///
    /// Short windows move quickly, so they are cached for less time.
    pub fn popular_products(period_days: u32) -> Duration {
        let secs = match period_days {
            0..=1 => 300,
            2..=3 => 600,
            4..=7 => 1800,
            8..=30 => 3600,
            _ => 7200,
        };
        Duration::from_secs(secs)
    }
}
