// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Product reads: detail, catalogue pages and best sellers

use crate::error::{EntityKind, ShopError};
use crate::shop::Shop;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shop_adapters::{CacheBackend, EventPort, LockPort};
use shop_core::{CacheKey, CacheTtl, Clock, IdGen, Product, ProductId};
use shop_storage::Repositories;
use std::collections::HashMap;

/// A product ranked by units sold
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopularProduct {
    pub product: Product,
    pub sold: u64,
}

impl<L, K, E, S, C, I> Shop<L, K, E, S, C, I>
where
    L: LockPort,
    K: CacheBackend,
    E: EventPort,
    S: Repositories,
    C: Clock,
    I: IdGen,
{
    pub(crate) fn find_product(&self, product: ProductId) -> Result<Product, ShopError> {
        self.store
            .find_product(product)?
            .ok_or_else(|| ShopError::not_found(EntityKind::Product, product.0))
    }

    pub async fn get_product(&self, product: ProductId) -> Result<Product, ShopError> {
        self.cache
            .get_or_load(
                &CacheKey::product(product),
                self.ttl.product_detail,
                || async { self.find_product(product) },
            )
            .await
    }

    /// A page of the catalogue in product id order
    pub async fn list_products(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Product>, ShopError> {
        self.cache
            .get_or_load(
                &CacheKey::product_list(limit, offset),
                self.ttl.product_list,
                || async { Ok::<_, ShopError>(self.store.products(limit, offset)?) },
            )
            .await
    }

    /// Best sellers of the last `period_days` days, most units first
    ///
    /// Only completed orders count. Ties go to the lower product id.
    pub async fn popular_products(
        &self,
        period_days: u32,
        limit: usize,
    ) -> Result<Vec<PopularProduct>, ShopError> {
        if period_days == 0 {
            return Err(ShopError::InvalidArgument {
                name: "period_days",
                reason: "must be at least one day".to_string(),
            });
        }
        if limit == 0 {
            return Err(ShopError::InvalidArgument {
                name: "limit",
                reason: "must be positive".to_string(),
            });
        }
        self.cache
            .get_or_load(
                &CacheKey::popular_products(period_days, limit),
                CacheTtl::popular_products(period_days),
                || async { self.rank_products(period_days, limit) },
            )
            .await
    }

    fn rank_products(
        &self,
        period_days: u32,
        limit: usize,
    ) -> Result<Vec<PopularProduct>, ShopError> {
        // A window reaching past the calendar's start counts every sale
        let since = chrono::TimeDelta::try_days(i64::from(period_days))
            .and_then(|window| self.clock.utc_now().checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let mut sold: HashMap<ProductId, u64> = HashMap::new();
        for order in self.store.orders_completed_since(since)? {
            for item in &order.items {
                *sold.entry(item.product_id).or_default() += u64::from(item.quantity);
            }
        }

        let mut ranked: Vec<(ProductId, u64)> = sold.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        let mut popular = Vec::with_capacity(limit.min(ranked.len()));
        for (product_id, sold) in ranked {
            if popular.len() == limit {
                break;
            }
            // A product removed since the sale is left out of the ranking
            if let Some(product) = self.store.find_product(product_id)? {
                popular.push(PopularProduct { product, sold });
            }
        }
        Ok(popular)
    }
}
