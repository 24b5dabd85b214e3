// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Balance operations

use crate::error::ShopError;
use crate::locking::{acquire_all, release_all};
use crate::shop::{OpContext, Shop};
use shop_adapters::{CacheBackend, EventPort, LockPort};
use shop_core::{Balance, CacheKey, Clock, DomainEvent, IdGen, LockKey, Money, UserId};
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
    /// Add `amount` to the user's balance, creating the row on first charge
    pub async fn charge_balance(&self, user: UserId, amount: Money) -> Result<Balance, ShopError> {
        let ctx = self.begin();
        let span = tracing::info_span!(
            "shop.charge_balance",
            %user,
            %amount,
            correlation_id = %ctx.correlation_id
        );
        self.charge_balance_inner(&ctx, user, amount)
            .instrument(span)
            .await
    }

    async fn charge_balance_inner(
        &self,
        ctx: &OpContext,
        user: UserId,
        amount: Money,
    ) -> Result<Balance, ShopError> {
        self.ensure_user(user)?;

        let keys = [LockKey::balance(user)];
        acquire_all(&self.lock, &keys, &ctx.holder).await?;
        let result = self.charge_locked(user, amount);
        release_all(&self.lock, &keys, &ctx.holder).await;
        let balance = result?;

        self.cache.evict(&CacheKey::balance(user)).await;
        self.record(
            ctx,
            DomainEvent::BalanceCharged {
                user_id: user,
                amount,
                balance: balance.amount,
            },
        )
        .await;
        tracing::info!(balance = %balance.amount, "balance charged");
        Ok(balance)
    }

    fn charge_locked(&self, user: UserId, amount: Money) -> Result<Balance, ShopError> {
        let now = self.clock.utc_now();
        let mut balance = self
            .store
            .find_balance(user)?
            .unwrap_or_else(|| Balance::empty(user, now));
        balance.charge(amount, now)?;
        self.store.save_balance(&balance)?;
        Ok(balance)
    }

    /// Current balance; a user who never charged has zero
    pub async fn get_balance(&self, user: UserId) -> Result<Balance, ShopError> {
        self.ensure_user(user)?;
        self.cache
            .get_or_load(&CacheKey::balance(user), self.ttl.user_balance, || async {
                let balance = self
                    .store
                    .find_balance(user)?
                    .unwrap_or_else(|| Balance::empty(user, self.clock.utc_now()));
                Ok::<_, ShopError>(balance)
            })
            .await
    }

    pub(crate) fn deduct_balance(
        &self,
        ctx: &OpContext,
        user: UserId,
        amount: Money,
    ) -> Result<Balance, ShopError> {
        let now = self.clock.utc_now();
        let mut balance = self
            .store
            .find_balance(user)?
            .unwrap_or_else(|| Balance::empty(user, now));
        balance.deduct(amount, now)?;
        self.store.save_balance(&balance)?;
        tracing::debug!(correlation_id = %ctx.correlation_id, %amount, remaining = %balance.amount, "balance deducted");
        Ok(balance)
    }
}
