// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Product inventory and the two-phase reservation protocol
//!
//! Stock moves from available to reserved at order time and is only consumed
//! on confirmation. Every operation here must run while the product's lock is
//! held; a failed operation leaves the product untouched.

use crate::id::ProductId;
use crate::money::Money;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InventoryError {
    #[error("quantity must be positive for product {product_id}")]
    InvalidQuantity { product_id: ProductId },
    #[error("product {product_id} out of stock: requested {requested}, available {available}")]
    OutOfStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },
    #[error(
        "invalid reservation on product {product_id}: requested {requested}, reserved {reserved}, stock {stock}"
    )]
    InvalidReservation {
        product_id: ProductId,
        requested: u32,
        reserved: u32,
        stock: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub stock: u32,
    pub reserved_stock: u32,
}

impl Product {
    pub fn new(id: ProductId, name: impl Into<String>, price: Money, stock: u32) -> Self {
        Self {
            id,
            name: name.into(),
            price,
            stock,
            reserved_stock: 0,
        }
    }

    /// Quantity that can still be reserved
    pub fn available(&self) -> u32 {
        self.stock.saturating_sub(self.reserved_stock)
    }

    /// Hold `qty` units without consuming them
    pub fn reserve(&mut self, qty: u32) -> Result<(), InventoryError> {
        if qty == 0 {
            return Err(InventoryError::InvalidQuantity {
                product_id: self.id,
            });
        }
        let available = self.available();
        if available < qty {
            return Err(InventoryError::OutOfStock {
                product_id: self.id,
                requested: qty,
                available,
            });
        }
        self.reserved_stock += qty;
        Ok(())
    }

    /// Permanently consume `qty` previously reserved units
    pub fn confirm_reservation(&mut self, qty: u32) -> Result<(), InventoryError> {
        if self.reserved_stock < qty || self.stock < qty {
            return Err(self.invalid_reservation(qty));
        }
        self.stock -= qty;
        self.reserved_stock -= qty;
        Ok(())
    }

    /// Release a hold without touching real stock
    pub fn cancel_reservation(&mut self, qty: u32) -> Result<(), InventoryError> {
        if self.reserved_stock < qty {
            return Err(self.invalid_reservation(qty));
        }
        self.reserved_stock -= qty;
        Ok(())
    }

    /// Undo a confirmation, putting the units back on hold
    pub fn restore_reservation(&mut self, qty: u32) {
        self.stock = self.stock.saturating_add(qty);
        self.reserved_stock = self.reserved_stock.saturating_add(qty);
    }

    fn invalid_reservation(&self, qty: u32) -> InventoryError {
        InventoryError::InvalidReservation {
            product_id: self.id,
            requested: qty,
            reserved: self.reserved_stock,
            stock: self.stock,
        }
    }
}

#[cfg(test)]
#[path = "product_tests.rs"]
mod tests;
