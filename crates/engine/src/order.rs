// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Order creation, lookup and cancellation

use crate::error::{EntityKind, ShopError};
use crate::locking::{acquire_all, product_keys, release_all};
use crate::shop::{OpContext, Shop};
use shop_adapters::{CacheBackend, EventPort, LockPort};
use shop_core::{
    merge_lines, CacheKey, Clock, DomainEvent, IdGen, KeyPattern, LockKey, Order, OrderId,
    OrderItem, OrderLine, ProductId, UserId,
};
use shop_storage::Repositories;
use tracing::Instrument;

impl<L, K, E, S, C, I> Shop<L, K, E, S, C, I>
where
    L: LockPort,
    K: CacheBackend,
    E: EventPort,
    S: Repositories,
    C: Clock,
    I: IdGen,
{
    /// Reserve stock for `lines` and record a PENDING order
    ///
    /// Repeated products are merged into one line. Either every line is
    /// reserved or none is.
    pub async fn create_order(&self, user: UserId, lines: &[OrderLine]) -> Result<Order, ShopError> {
        let ctx = self.begin();
        let span = tracing::info_span!(
            "shop.create_order",
            %user,
            lines = lines.len(),
            correlation_id = %ctx.correlation_id
        );
        self.create_order_inner(&ctx, user, lines)
            .instrument(span)
            .await
    }

    async fn create_order_inner(
        &self,
        ctx: &OpContext,
        user: UserId,
        lines: &[OrderLine],
    ) -> Result<Order, ShopError> {
        let merged = merge_lines(lines)?;
        self.ensure_user(user)?;

        let keys = product_keys(merged.keys().copied());
        acquire_all(&self.lock, &keys, &ctx.holder).await?;
        let result = self.create_order_locked(user, &merged);
        release_all(&self.lock, &keys, &ctx.holder).await;
        let order = result?;

        self.evict_stock(&order).await;
        self.cache
            .evict_by_pattern(&KeyPattern::order_lists(user))
            .await;
        self.record(
            ctx,
            DomainEvent::OrderCreated {
                order_id: order.id,
                user_id: user,
                total: order.total,
            },
        )
        .await;
        tracing::info!(order_id = %order.id, total = %order.total, "order created");
        Ok(order)
    }

    fn create_order_locked(
        &self,
        user: UserId,
        merged: &std::collections::BTreeMap<ProductId, u32>,
    ) -> Result<Order, ShopError> {
        let mut reserved = Vec::with_capacity(merged.len());
        let mut items = Vec::with_capacity(merged.len());
        for (&product_id, &quantity) in merged {
            let mut product = self.find_product(product_id)?;
            product.reserve(quantity)?;
            items.push(OrderItem {
                product_id,
                quantity,
                unit_price: product.price,
            });
            reserved.push((product, quantity));
        }

        let order = Order::new(self.store.next_order_id(), user, items, self.clock.utc_now())?;

        // Reservations become visible only once every line has been reserved
        let mut saved = Vec::with_capacity(reserved.len());
        for (product, quantity) in &reserved {
            if let Err(e) = self.store.save_product(product) {
                self.cancel_saved_reservations(&saved);
                return Err(e.into());
            }
            saved.push((product.id, *quantity));
        }
        if let Err(e) = self.store.save_order(&order) {
            self.cancel_saved_reservations(&saved);
            return Err(e.into());
        }
        Ok(order)
    }

    /// Undo reservations already written; the caller still holds the locks
    fn cancel_saved_reservations(&self, saved: &[(ProductId, u32)]) {
        for &(product_id, quantity) in saved.iter().rev() {
            let undone = self.find_product(product_id).and_then(|mut product| {
                product.cancel_reservation(quantity)?;
                self.store.save_product(&product)?;
                Ok(())
            });
            if let Err(e) = undone {
                tracing::error!(%product_id, quantity, error = %e, "failed to undo reservation");
            }
        }
    }

    pub(crate) fn find_order(&self, order: OrderId) -> Result<Order, ShopError> {
        self.store
            .find_order(order)?
            .ok_or_else(|| ShopError::not_found(EntityKind::Order, order.0))
    }

    /// One order of `user`
    pub async fn get_order(&self, user: UserId, order: OrderId) -> Result<Order, ShopError> {
        let found = self
            .cache
            .get_or_load(&CacheKey::order(order), self.ttl.order_detail, || async {
                self.find_order(order)
            })
            .await?;
        found.ensure_owned_by(user)?;
        Ok(found)
    }

    /// A page of the user's orders, newest first
    pub async fn list_orders(
        &self,
        user: UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Order>, ShopError> {
        self.ensure_user(user)?;
        self.cache
            .get_or_load(
                &CacheKey::order_list(user, limit, offset),
                self.ttl.order_list,
                || async { Ok::<_, ShopError>(self.store.orders_by_user(user, limit, offset)?) },
            )
            .await
    }

    /// Cancel a PENDING order and give its reserved stock back
    pub async fn cancel_order(&self, user: UserId, order: OrderId) -> Result<Order, ShopError> {
        let ctx = self.begin();
        let span = tracing::info_span!(
            "shop.cancel_order",
            %user,
            %order,
            correlation_id = %ctx.correlation_id
        );
        self.cancel_order_inner(&ctx, user, order)
            .instrument(span)
            .await
    }

    async fn cancel_order_inner(
        &self,
        ctx: &OpContext,
        user: UserId,
        order_id: OrderId,
    ) -> Result<Order, ShopError> {
        // Same lock the payment saga takes first, so a cancel cannot race a payment
        let payment_key = [LockKey::payment(order_id)];
        acquire_all(&self.lock, &payment_key, &ctx.holder).await?;
        let result = self.cancel_order_locked(ctx, user, order_id).await;
        release_all(&self.lock, &payment_key, &ctx.holder).await;
        let order = result?;

        self.cache.evict(&CacheKey::order(order.id)).await;
        self.cache
            .evict_by_pattern(&KeyPattern::order_lists(user))
            .await;
        self.evict_stock(&order).await;
        self.record(
            ctx,
            DomainEvent::OrderCancelled {
                order_id: order.id,
                user_id: user,
            },
        )
        .await;
        tracing::info!(order_id = %order.id, "order cancelled");
        Ok(order)
    }

    async fn cancel_order_locked(
        &self,
        ctx: &OpContext,
        user: UserId,
        order_id: OrderId,
    ) -> Result<Order, ShopError> {
        let mut order = self.find_order(order_id)?;
        order.ensure_owned_by(user)?;
        // Only PENDING orders get this far
        order.cancel()?;

        let keys = product_keys(order.items.iter().map(|i| i.product_id));
        acquire_all(&self.lock, &keys, &ctx.holder).await?;
        let result = self.release_reservations(&order);
        release_all(&self.lock, &keys, &ctx.holder).await;
        result?;
        Ok(order)
    }

    /// Drop cached views of every product whose stock `order` moved
    pub(crate) async fn evict_stock(&self, order: &Order) {
        for item in &order.items {
            self.cache
                .evict_by_pattern(&KeyPattern::product(item.product_id))
                .await;
        }
        self.cache.evict_by_pattern(&KeyPattern::product_lists()).await;
    }

    /// Give back the stock of a cancelled `order` and store it
    ///
    /// Every reservation is checked before anything is written. A failed
    /// write re-reserves what was already given back, so the stored order
    /// stays PENDING with its stock intact and a retry starts clean.
    fn release_reservations(&self, order: &Order) -> Result<(), ShopError> {
        let mut released = Vec::with_capacity(order.items.len());
        for item in &order.items {
            let mut product = self.find_product(item.product_id)?;
            product.cancel_reservation(item.quantity)?;
            released.push((product, item.quantity));
        }

        let mut saved = Vec::with_capacity(released.len());
        for (product, quantity) in &released {
            if let Err(e) = self.store.save_product(product) {
                self.reserve_again(&saved);
                return Err(e.into());
            }
            saved.push((product.id, *quantity));
        }
        if let Err(e) = self.store.save_order(order) {
            self.reserve_again(&saved);
            return Err(e.into());
        }
        Ok(())
    }

    /// Undo released reservations; the caller still holds the locks
    fn reserve_again(&self, saved: &[(ProductId, u32)]) {
        for &(product_id, quantity) in saved.iter().rev() {
            let redone = self.find_product(product_id).and_then(|mut product| {
                product.reserve(quantity)?;
                self.store.save_product(&product)?;
                Ok(())
            });
            if let Err(e) = redone {
                tracing::error!(%product_id, quantity, error = %e, "failed to restore reservation");
            }
        }
    }
}
