// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock keys, cache keys, invalidation patterns and lock ordering
//!
//! Lock keys have two segments (`domain:identifier`), cache keys three
//! (`domain:type:identifier`). Every call site builds keys through the
//! constructors here so that the same resource always maps to the same key.

use crate::id::{CouponId, OrderId, ProductId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

const SEPARATOR: char = ':';

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("key `{key}` has fewer than {expected} segments")]
    TooFewSegments { key: String, expected: usize },
}

fn segments(key: &str) -> impl Iterator<Item = &str> {
    key.split(SEPARATOR)
}

fn validate(key: &str, expected: usize) -> Result<(), KeyError> {
    let parts: Vec<&str> = segments(key).collect();
    if parts.len() < expected || parts.iter().any(|p| p.is_empty()) {
        return Err(KeyError::TooFewSegments {
            key: key.to_string(),
            expected,
        });
    }
    Ok(())
}

/// Name of a mutual-exclusion lock
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LockKey(String);

impl LockKey {
    pub fn parse(key: impl Into<String>) -> Result<Self, KeyError> {
        let key = key.into();
        validate(&key, 2)?;
        Ok(Self(key))
    }

    pub fn balance(user: UserId) -> Self {
        Self(format!("balance:user_{user}"))
    }

    pub fn product(product: ProductId) -> Self {
        Self(format!("product:product_{product}"))
    }

    pub fn coupon(coupon: CouponId) -> Self {
        Self(format!("coupon:coupon_{coupon}"))
    }

    pub fn payment(order: OrderId) -> Self {
        Self(format!("payment:order_{order}"))
    }

    pub fn domain(&self) -> &str {
        segments(&self.0).next().unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LockKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name of a cache entry
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn parse(key: impl Into<String>) -> Result<Self, KeyError> {
        let key = key.into();
        validate(&key, 3)?;
        Ok(Self(key))
    }

    pub fn balance(user: UserId) -> Self {
        Self(format!("balance:info:user_{user}"))
    }

    pub fn product(product: ProductId) -> Self {
        Self(format!("product:info:product_{product}"))
    }

    pub fn coupon(coupon: CouponId) -> Self {
        Self(format!("coupon:info:coupon_{coupon}"))
    }

    pub fn product_list(limit: usize, offset: usize) -> Self {
        Self(format!("product:list:limit_{limit}_offset_{offset}"))
    }

    /// Best sellers over the last `period_days` days
    pub fn popular_products(period_days: u32, limit: usize) -> Self {
        Self(format!("product:popular:days_{period_days}_limit_{limit}"))
    }

    pub fn order(order: OrderId) -> Self {
        Self(format!("order:info:order_{order}"))
    }

    pub fn order_list(user: UserId, limit: usize, offset: usize) -> Self {
        Self(format!("order:list:user_{user}_limit_{limit}_offset_{offset}"))
    }

    pub fn coupon_list(user: UserId, limit: usize, offset: usize) -> Self {
        Self(format!("coupon:list:user_{user}_limit_{limit}_offset_{offset}"))
    }

    pub fn domain(&self) -> &str {
        segments(&self.0).next().unwrap_or_default()
    }

    pub fn cache_type(&self) -> &str {
        segments(&self.0).nth(1).unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pattern for matching cache keys during invalidation
///
/// Supports:
///   - Exact: "order:info:order_7"
///   - Single segment: "product:*:product_7" matches any cache type
///   - Glob within a segment: "order:list:user_7_*"
///   - Remainder: "product:**" matches every product key
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyPattern(String);

impl KeyPattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self(pattern.into())
    }

    /// Every cached order page of a user
    pub fn order_lists(user: UserId) -> Self {
        Self(format!("order:list:user_{user}_*"))
    }

    /// Every cached coupon page of a user
    pub fn coupon_lists(user: UserId) -> Self {
        Self(format!("coupon:list:user_{user}_*"))
    }

    /// Every cached page of the product catalogue
    pub fn product_lists() -> Self {
        Self("product:list:*".to_string())
    }

    /// Every cache entry describing one product
    pub fn product(product: ProductId) -> Self {
        Self(format!("product:*:product_{product}"))
    }

    /// Check if this pattern matches a key
    pub fn matches(&self, key: &str) -> bool {
        if self.0.is_empty() {
            return false;
        }
        if self.0 == "**" {
            return true;
        }

        let pattern_parts: Vec<&str> = segments(&self.0).collect();
        let key_parts: Vec<&str> = segments(key).collect();

        Self::match_segments(&pattern_parts, &key_parts)
    }

    fn match_segments(pattern: &[&str], key: &[&str]) -> bool {
        match (pattern.first(), key.first()) {
            (None, None) => true,
            (Some(&"**"), _) => true,
            (Some(p), Some(k)) if glob_match(p, k) => {
                Self::match_segments(&pattern[1..], &key[1..])
            }
            _ => false,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for KeyPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// `*` matches any run of characters, everything else is literal
fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern = pattern.as_bytes();
    let text = text.as_bytes();
    let (mut p, mut t) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && pattern[p] == b'*' {
            star = Some((p, t));
            p += 1;
        } else if p < pattern.len() && pattern[p] == text[t] {
            p += 1;
            t += 1;
        } else if let Some((sp, st)) = star {
            p = sp + 1;
            t = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|&c| c == b'*')
}

/// Deduplicate and sort resource ids ascending before locking them
///
/// Every multi-resource acquisition goes through this so that overlapping
/// requests always lock in the same relative order.
pub fn lock_order<I: Ord>(ids: impl IntoIterator<Item = I>) -> Vec<I> {
    ids.into_iter().collect::<BTreeSet<_>>().into_iter().collect()
}

/// The payment saga's fixed cross-domain order: payment, then balance
pub fn payment_saga_keys(order: OrderId, user: UserId) -> [LockKey; 2] {
    [LockKey::payment(order), LockKey::balance(user)]
}

#[cfg(test)]
#[path = "keys_tests.rs"]
mod tests;
