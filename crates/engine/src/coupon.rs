// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coupon issuance and the coupon expiry sweep

use crate::error::{EntityKind, ShopError};
use crate::locking::{acquire_all, release_all};
use crate::shop::{OpContext, Shop};
use serde::{Deserialize, Serialize};
use shop_adapters::{CacheBackend, EventPort, LockPort};
use shop_core::{
    CacheKey, Clock, Coupon, CouponError, CouponHistory, CouponHistoryStatus, CouponId,
    CouponStatus, DomainEvent, IdGen, KeyPattern, LockKey, UserId,
};
use shop_storage::Repositories;
use std::collections::BTreeSet;
use tracing::Instrument;

/// One coupon held by a user, with the coupon's terms
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCoupon {
    pub history: CouponHistory,
    pub coupon: Coupon,
}

/// Counts from one expiry sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpiryReport {
    pub coupons: usize,
    pub histories: usize,
    /// Coupons skipped because their lock was busy
    pub skipped: usize,
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
    /// Issue one unit of `coupon` to `user`
    ///
    /// At most one issuance per (user, coupon), and never more than the
    /// coupon's quota across all users.
    pub async fn issue_coupon(
        &self,
        user: UserId,
        coupon: CouponId,
    ) -> Result<CouponHistory, ShopError> {
        let ctx = self.begin();
        let span = tracing::info_span!(
            "shop.issue_coupon",
            %user,
            %coupon,
            correlation_id = %ctx.correlation_id
        );
        self.issue_coupon_inner(&ctx, user, coupon)
            .instrument(span)
            .await
    }

    async fn issue_coupon_inner(
        &self,
        ctx: &OpContext,
        user: UserId,
        coupon: CouponId,
    ) -> Result<CouponHistory, ShopError> {
        self.ensure_user(user)?;

        let keys = [LockKey::coupon(coupon)];
        acquire_all(&self.lock, &keys, &ctx.holder).await?;
        let result = self.issue_locked(user, coupon);
        release_all(&self.lock, &keys, &ctx.holder).await;
        let history = result?;

        self.cache.evict(&CacheKey::coupon(coupon)).await;
        self.cache
            .evict_by_pattern(&KeyPattern::coupon_lists(user))
            .await;
        self.record(
            ctx,
            DomainEvent::CouponIssued {
                coupon_id: coupon,
                user_id: user,
                history_id: history.id,
            },
        )
        .await;
        tracing::info!(history_id = %history.id, "coupon issued");
        Ok(history)
    }

    fn issue_locked(&self, user: UserId, coupon_id: CouponId) -> Result<CouponHistory, ShopError> {
        let now = self.clock.utc_now();
        let mut coupon = self
            .store
            .find_coupon(coupon_id)?
            .ok_or_else(|| ShopError::not_found(EntityKind::Coupon, coupon_id.0))?;

        coupon.check_issuable(now)?;
        if self.store.find_history_for(user, coupon_id)?.is_some() {
            return Err(CouponError::AlreadyIssued {
                coupon_id,
                user_id: user,
            }
            .into());
        }

        coupon.issue(now)?;
        self.store.save_coupon(&coupon)?;

        let history = CouponHistory::issued(self.store.next_history_id(), user, coupon_id, now);
        self.store.save_history(&history)?;
        Ok(history)
    }

    /// A page of the user's coupons, newest issuance first
    pub async fn get_coupon_list(
        &self,
        user: UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<UserCoupon>, ShopError> {
        self.ensure_user(user)?;
        let key = CacheKey::coupon_list(user, limit, offset);
        self.cache
            .get_or_load(&key, self.ttl.user_coupon_list, || async {
                let histories = self.store.histories_by_user(user, limit, offset)?;
                let mut page = Vec::with_capacity(histories.len());
                for history in histories {
                    let coupon = self.store.find_coupon(history.coupon_id)?.ok_or_else(|| {
                        ShopError::not_found(EntityKind::Coupon, history.coupon_id.0)
                    })?;
                    page.push(UserCoupon { history, coupon });
                }
                Ok::<_, ShopError>(page)
            })
            .await
    }

    /// Coupon terms, served from cache when possible
    pub(crate) async fn load_coupon(&self, coupon: CouponId) -> Result<Coupon, ShopError> {
        self.cache
            .get_or_load(&CacheKey::coupon(coupon), self.ttl.coupon_info, || async {
                self.store
                    .find_coupon(coupon)?
                    .ok_or_else(|| ShopError::not_found(EntityKind::Coupon, coupon.0))
            })
            .await
    }

    /// Expire every coupon whose window has closed, with its unused issuances
    ///
    /// Used issuances are left as they are.
    pub async fn expire_coupons(&self) -> Result<ExpiryReport, ShopError> {
        let ctx = self.begin();
        let span = tracing::info_span!("shop.expire_coupons", correlation_id = %ctx.correlation_id);
        self.expire_coupons_inner(&ctx).instrument(span).await
    }

    async fn expire_coupons_inner(&self, ctx: &OpContext) -> Result<ExpiryReport, ShopError> {
        let due = self.store.coupons_past_end(self.clock.utc_now())?;
        let mut report = ExpiryReport::default();

        for coupon in due {
            let keys = [LockKey::coupon(coupon.id)];
            if let Err(e) = acquire_all(&self.lock, &keys, &ctx.holder).await {
                tracing::debug!(coupon_id = %coupon.id, error = %e, "coupon busy, expiring next sweep");
                report.skipped += 1;
                continue;
            }
            let result = self.expire_locked(coupon.id);
            release_all(&self.lock, &keys, &ctx.holder).await;

            let Some(users) = result? else {
                continue;
            };
            report.coupons += 1;
            report.histories += users.len();

            self.cache.evict(&CacheKey::coupon(coupon.id)).await;
            for user in &users {
                self.cache
                    .evict_by_pattern(&KeyPattern::coupon_lists(*user))
                    .await;
            }
            self.record(
                ctx,
                DomainEvent::CouponExpired {
                    coupon_id: coupon.id,
                    expired_histories: users.len(),
                },
            )
            .await;
        }

        if report.coupons > 0 || report.skipped > 0 {
            tracing::info!(
                coupons = report.coupons,
                histories = report.histories,
                skipped = report.skipped,
                "coupon expiry sweep"
            );
        }
        Ok(report)
    }

    /// Returns the users whose issuance expired, or None if the coupon no
    /// longer needs expiring
    fn expire_locked(&self, coupon_id: CouponId) -> Result<Option<BTreeSet<UserId>>, ShopError> {
        let now = self.clock.utc_now();
        let Some(mut coupon) = self.store.find_coupon(coupon_id)? else {
            return Ok(None);
        };
        if !coupon.is_expired_at(now) || !coupon.status.can_transition_to(CouponStatus::Expired) {
            return Ok(None);
        }
        coupon.expire()?;
        self.store.save_coupon(&coupon)?;

        let mut users = BTreeSet::new();
        for mut history in self.store.histories_by_coupon(coupon_id)? {
            if history.status != CouponHistoryStatus::Issued {
                continue;
            }
            history.expire(now)?;
            self.store.save_history(&history)?;
            users.insert(history.user_id);
        }
        Ok(Some(users))
    }
}
