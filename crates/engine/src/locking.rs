// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Acquire and release groups of locks
//!
//! Callers pass keys already in their global order (see
//! `shop_core::lock_order` and `shop_core::payment_saga_keys`). A group is
//! all-or-nothing: if any key is refused, the keys already held are released
//! in reverse order before the conflict is returned.

use crate::error::ShopError;
use shop_adapters::LockPort;
use shop_core::{lock_order, HolderId, LockKey, ProductId};

pub(crate) async fn acquire_all<L: LockPort>(
    lock: &L,
    keys: &[LockKey],
    holder: &HolderId,
) -> Result<(), ShopError> {
    for (held, key) in keys.iter().enumerate() {
        if !lock.acquire(key, holder).await {
            tracing::debug!(%key, %holder, held, "lock refused, backing out");
            release_all(lock, &keys[..held], holder).await;
            return Err(ShopError::ConcurrencyConflict { key: key.clone() });
        }
    }
    Ok(())
}

/// Release in reverse acquisition order
pub(crate) async fn release_all<L: LockPort>(lock: &L, keys: &[LockKey], holder: &HolderId) {
    for key in keys.iter().rev() {
        lock.release(key, holder).await;
    }
}

/// Product lock keys in ascending product order, duplicates removed
pub(crate) fn product_keys(products: impl IntoIterator<Item = ProductId>) -> Vec<LockKey> {
    lock_order(products)
        .into_iter()
        .map(LockKey::product)
        .collect()
}

#[cfg(test)]
#[path = "locking_tests.rs"]
mod tests;
