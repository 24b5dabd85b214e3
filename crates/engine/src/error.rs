// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the storefront engine

use shop_core::{
    BalanceError, CouponError, EventLogError, HistoryError, InventoryError, LockKey, OrderError,
};
use shop_storage::StoreError;
use thiserror::Error;

/// Entity named in a NotFound error
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    User,
    Product,
    Coupon,
    CouponHistory,
    Order,
    EventLog,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntityKind::User => "user",
            EntityKind::Product => "product",
            EntityKind::Coupon => "coupon",
            EntityKind::CouponHistory => "coupon history",
            EntityKind::Order => "order",
            EntityKind::EventLog => "event log",
        };
        f.write_str(name)
    }
}

/// Coarse category of a `ShopError`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Lock not obtained; the caller may retry
    Conflict,
    NotFound,
    InvalidInput,
    Unauthorized,
    /// A business rule refused the operation
    Rejected,
    Internal,
}

/// Errors returned by every `Shop` operation
#[derive(Debug, Error)]
pub enum ShopError {
    #[error("resource busy, could not acquire {key}")]
    ConcurrencyConflict { key: LockKey },
    #[error("{entity} {id} not found")]
    NotFound { entity: EntityKind, id: u64 },
    #[error("invalid {name}: {reason}")]
    InvalidArgument { name: &'static str, reason: String },
    #[error(transparent)]
    Inventory(#[from] InventoryError),
    #[error(transparent)]
    Balance(#[from] BalanceError),
    #[error(transparent)]
    Coupon(#[from] CouponError),
    #[error(transparent)]
    History(#[from] HistoryError),
    #[error(transparent)]
    Order(#[from] OrderError),
    #[error(transparent)]
    EventLog(#[from] EventLogError),
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl ShopError {
    pub(crate) fn not_found(entity: EntityKind, id: u64) -> Self {
        ShopError::NotFound { entity, id }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ShopError::ConcurrencyConflict { .. } => ErrorKind::Conflict,
            ShopError::NotFound { .. } => ErrorKind::NotFound,
            ShopError::InvalidArgument { .. }
            | ShopError::Inventory(InventoryError::InvalidQuantity { .. })
            | ShopError::Balance(BalanceError::InvalidAmount { .. })
            | ShopError::Order(OrderError::EmptyItems | OrderError::InvalidQuantity { .. }) => {
                ErrorKind::InvalidInput
            }
            ShopError::Order(OrderError::Unauthorized { .. }) => ErrorKind::Unauthorized,
            ShopError::Inventory(InventoryError::InvalidReservation { .. })
            | ShopError::EventLog(_)
            | ShopError::Storage(_) => ErrorKind::Internal,
            ShopError::Inventory(_)
            | ShopError::Balance(_)
            | ShopError::Coupon(_)
            | ShopError::History(_)
            | ShopError::Order(_) => ErrorKind::Rejected,
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
