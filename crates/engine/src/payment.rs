// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The payment saga
//!
//! Locks are taken payment, then balance, then products in id order. Any
//! operation that needs more than one of these domains follows the same
//! order, so two sagas can never wait on each other in a cycle.

use crate::error::{EntityKind, ShopError};
use crate::locking::{acquire_all, product_keys, release_all};
use crate::shop::{OpContext, Shop};
use shop_adapters::{CacheBackend, EventPort, LockPort};
use shop_core::{
    payment_saga_keys, Balance, CacheKey, Clock, Coupon, CouponHistory, CouponHistoryStatus,
    CouponId, DomainEvent, HistoryError, IdGen, KeyPattern, Money, Order, OrderId, OrderStatus,
    Payment, UserId,
};
use shop_storage::Repositories;
use tracing::Instrument;

/// A coupon the user is about to spend, with its terms
struct HeldCoupon {
    history: CouponHistory,
    coupon: Coupon,
}

struct Settlement {
    payment: Payment,
    order: Order,
    /// None when nothing was owed after the discount
    balance: Option<Balance>,
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
    /// Pay for a PENDING order from the user's balance
    ///
    /// `coupon` must be one the user holds unused. A failure after the
    /// balance was deducted is not compensated; it is logged and recorded as
    /// a `PaymentFailed` event for reconciliation.
    pub async fn pay_order(
        &self,
        user: UserId,
        order: OrderId,
        coupon: Option<CouponId>,
    ) -> Result<Payment, ShopError> {
        let ctx = self.begin();
        let span = tracing::info_span!(
            "shop.pay_order",
            %user,
            %order,
            coupon = ?coupon,
            correlation_id = %ctx.correlation_id
        );
        self.pay_order_inner(&ctx, user, order, coupon)
            .instrument(span)
            .await
    }

    async fn pay_order_inner(
        &self,
        ctx: &OpContext,
        user: UserId,
        order: OrderId,
        coupon: Option<CouponId>,
    ) -> Result<Payment, ShopError> {
        let keys = payment_saga_keys(order, user);
        acquire_all(&self.lock, &keys, &ctx.holder).await?;
        let result = self.pay_locked(ctx, user, order, coupon).await;
        release_all(&self.lock, &keys, &ctx.holder).await;

        let settled = match result {
            Ok(settled) => settled,
            Err(e) => {
                if matches!(e, ShopError::History(HistoryError::Expired { .. })) {
                    self.cache
                        .evict_by_pattern(&KeyPattern::coupon_lists(user))
                        .await;
                }
                return Err(e);
            }
        };
        let Settlement {
            payment,
            order,
            balance,
        } = settled;

        self.cache.evict(&CacheKey::balance(user)).await;
        self.cache.evict(&CacheKey::order(order.id)).await;
        self.cache
            .evict_by_pattern(&KeyPattern::order_lists(user))
            .await;
        if payment.coupon_id.is_some() {
            self.cache
                .evict_by_pattern(&KeyPattern::coupon_lists(user))
                .await;
        }
        self.evict_stock(&order).await;

        if let Some(balance) = balance {
            self.record(
                ctx,
                DomainEvent::BalanceDeducted {
                    user_id: user,
                    amount: payment.amount,
                    balance: balance.amount,
                },
            )
            .await;
        }
        self.record(
            ctx,
            DomainEvent::OrderCompleted {
                order_id: order.id,
                user_id: user,
            },
        )
        .await;
        self.record(
            ctx,
            DomainEvent::PaymentCompleted {
                payment_id: payment.id,
                order_id: order.id,
                user_id: user,
                amount: payment.amount,
                coupon_id: payment.coupon_id,
            },
        )
        .await;
        tracing::info!(
            payment_id = %payment.id,
            amount = %payment.amount,
            original = %payment.original_amount,
            "order paid"
        );
        Ok(payment)
    }

    async fn pay_locked(
        &self,
        ctx: &OpContext,
        user: UserId,
        order_id: OrderId,
        coupon: Option<CouponId>,
    ) -> Result<Settlement, ShopError> {
        self.ensure_user(user)?;
        let order = self.find_order(order_id)?;
        order.ensure_owned_by(user)?;
        order.ensure_payable()?;

        let held = match coupon {
            Some(coupon) => Some(self.held_coupon(user, coupon).await?),
            None => None,
        };
        let amount = match &held {
            Some(held) => order.total.discounted(held.coupon.discount_rate),
            None => order.total,
        };

        let balance = if amount.is_zero() {
            None
        } else {
            Some(self.deduct_balance(ctx, user, amount)?)
        };

        match self.settle(ctx, order, held, amount).await {
            Ok((payment, order)) => Ok(Settlement {
                payment,
                order,
                balance,
            }),
            Err(e) => {
                if balance.is_some() {
                    tracing::error!(
                        correlation_id = %ctx.correlation_id,
                        %user,
                        order_id = %order_id,
                        deducted = %amount,
                        error = %e,
                        "payment failed after balance deduction, needs reconciliation"
                    );
                    self.record(
                        ctx,
                        DomainEvent::PaymentFailed {
                            order_id,
                            user_id: user,
                            deducted: amount,
                            reason: e.to_string(),
                        },
                    )
                    .await;
                }
                Err(e)
            }
        }
    }

    /// The user's unused issuance of `coupon`, checked against the coupon's end
    async fn held_coupon(&self, user: UserId, coupon_id: CouponId) -> Result<HeldCoupon, ShopError> {
        let coupon = self.load_coupon(coupon_id).await?;
        let mut history = self
            .store
            .find_history_for(user, coupon_id)?
            .filter(CouponHistory::is_usable)
            .ok_or_else(|| ShopError::not_found(EntityKind::CouponHistory, coupon_id.0))?;

        let now = self.clock.utc_now();
        if coupon.is_expired_at(now) {
            history.expire(now)?;
            self.store.save_history(&history)?;
            return Err(HistoryError::Expired {
                history_id: history.id,
                coupon_id,
            }
            .into());
        }
        Ok(HeldCoupon { history, coupon })
    }

    /// Consume the reserved stock and write the paid state
    async fn settle(
        &self,
        ctx: &OpContext,
        order: Order,
        held: Option<HeldCoupon>,
        amount: Money,
    ) -> Result<(Payment, Order), ShopError> {
        let keys = product_keys(order.items.iter().map(|i| i.product_id));
        acquire_all(&self.lock, &keys, &ctx.holder).await?;
        let result = self.settle_locked(order, held, amount);
        release_all(&self.lock, &keys, &ctx.holder).await;
        result
    }

    fn settle_locked(
        &self,
        mut order: Order,
        held: Option<HeldCoupon>,
        amount: Money,
    ) -> Result<(Payment, Order), ShopError> {
        self.confirm_items(&order)?;

        match self.write_paid(&mut order, held, amount) {
            Ok(payment) => Ok((payment, order)),
            Err(e) => {
                // Stock goes back on hold only while the stored order still
                // awaits payment
                let still_pending = matches!(
                    self.store.find_order(order.id),
                    Ok(Some(stored)) if stored.status == OrderStatus::Pending
                );
                if still_pending {
                    self.restore_items(&order, order.items.len());
                }
                Err(e)
            }
        }
    }

    fn write_paid(
        &self,
        order: &mut Order,
        held: Option<HeldCoupon>,
        amount: Money,
    ) -> Result<Payment, ShopError> {
        let now = self.clock.utc_now();
        let coupon_id = match held {
            Some(HeldCoupon {
                mut history,
                coupon,
            }) => {
                if let Err(e) = history.use_coupon(order.id, coupon.end_at, now) {
                    // The coupon ran out mid-saga; keep the EXPIRED row
                    if history.status == CouponHistoryStatus::Expired {
                        self.store.save_history(&history)?;
                    }
                    return Err(e.into());
                }
                self.store.save_history(&history)?;
                Some(coupon.id)
            }
            None => None,
        };

        order.complete(now)?;
        self.store.save_order(order)?;

        let payment = Payment::paid(
            self.store.next_payment_id(),
            order.id,
            order.user_id,
            amount,
            order.total,
            coupon_id,
            now,
        );
        self.store.save_payment(&payment)?;
        Ok(payment)
    }

    /// Confirm every item's reservation, or none of them
    fn confirm_items(&self, order: &Order) -> Result<(), ShopError> {
        for (done, item) in order.items.iter().enumerate() {
            let confirmed = self.find_product(item.product_id).and_then(|mut product| {
                product.confirm_reservation(item.quantity)?;
                self.store.save_product(&product)?;
                Ok(())
            });
            if let Err(e) = confirmed {
                self.restore_items(order, done);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Put the first `count` confirmed items back on hold
    fn restore_items(&self, order: &Order, count: usize) {
        for item in order.items[..count].iter().rev() {
            let restored = self.find_product(item.product_id).and_then(|mut product| {
                product.restore_reservation(item.quantity);
                self.store.save_product(&product)?;
                Ok(())
            });
            if let Err(e) = restored {
                tracing::error!(
                    order_id = %order.id,
                    product_id = %item.product_id,
                    quantity = item.quantity,
                    error = %e,
                    "failed to restore confirmed stock"
                );
            }
        }
    }
}
