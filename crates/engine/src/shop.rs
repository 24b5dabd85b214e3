// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The storefront facade

use crate::config::ShopConfig;
use crate::error::{EntityKind, ShopError};
use crate::outbox::{Outbox, RetryReport};
use shop_adapters::{Cache, CacheBackend, EventPort, LockPort};
use shop_core::{CacheTtl, Clock, DomainEvent, EventLogId, HolderId, IdGen, UserId};
use shop_storage::Repositories;

/// Adapter dependencies of a `Shop`
pub struct ShopDeps<L, K, E, S> {
    pub lock: L,
    pub cache: K,
    pub events: E,
    pub store: S,
}

/// Identity of one facade call
///
/// The same token names the lock holder and correlates the call's events.
pub(crate) struct OpContext {
    pub(crate) correlation_id: String,
    pub(crate) holder: HolderId,
}

/// Entry point for every storefront operation
///
/// Cheap to clone; clones share adapters and storage.
#[derive(Clone)]
pub struct Shop<L, K, E, S, C: Clock, I: IdGen> {
    pub(crate) lock: L,
    pub(crate) cache: Cache<K>,
    pub(crate) store: S,
    pub(crate) outbox: Outbox<E, S, C>,
    pub(crate) ttl: CacheTtl,
    pub(crate) clock: C,
    id_gen: I,
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
    pub fn new(deps: ShopDeps<L, K, E, S>, config: &ShopConfig, clock: C, id_gen: I) -> Self {
        let cache = Cache::new(deps.cache);
        let cache = if config.cache.jitter {
            cache
        } else {
            cache.without_jitter()
        };
        Self {
            lock: deps.lock,
            cache,
            outbox: Outbox::new(
                deps.events,
                deps.store.clone(),
                clock.clone(),
                config.outbox.clone(),
            ),
            store: deps.store,
            ttl: config.cache.ttl.clone(),
            clock,
            id_gen,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub(crate) fn begin(&self) -> OpContext {
        let token = self.id_gen.next();
        OpContext {
            holder: HolderId::new(token.clone()),
            correlation_id: token,
        }
    }

    pub(crate) fn ensure_user(&self, user: UserId) -> Result<(), ShopError> {
        if !self.store.user_exists(user)? {
            return Err(ShopError::not_found(EntityKind::User, user.0));
        }
        Ok(())
    }

    pub(crate) async fn record(&self, ctx: &OpContext, event: DomainEvent) {
        self.outbox.record(&event, &ctx.correlation_id).await;
    }

    /// Re-publish failed events whose retry time has come
    pub async fn retry_failed_events(&self) -> Result<RetryReport, ShopError> {
        self.outbox.retry_due().await
    }

    /// Acknowledge a published event on behalf of a downstream consumer
    pub fn complete_event(&self, id: EventLogId) -> Result<(), ShopError> {
        self.outbox.complete(id)
    }
}
