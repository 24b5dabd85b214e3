// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for the engine integration tests

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use shop_adapters::{FakeCacheBackend, FakeLockAdapter, FakePublisher};
use shop_core::{
    Coupon, CouponId, DiscountRate, FakeClock, Money, Product, ProductId, SequentialIdGen, User,
    UserId,
};
use shop_engine::{Shop, ShopConfig, ShopDeps};
use shop_storage::{CouponRepository, ProductRepository, Store, UserRepository};

pub type TestShop =
    Shop<FakeLockAdapter, FakeCacheBackend, FakePublisher, Store, FakeClock, SequentialIdGen>;

pub struct Harness {
    pub shop: TestShop,
    pub lock: FakeLockAdapter,
    pub cache: FakeCacheBackend,
    pub events: FakePublisher,
    pub store: Store,
    pub clock: FakeClock,
}

/// 2026-03-01 12:00 UTC
pub fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

pub fn config() -> ShopConfig {
    let mut config = ShopConfig::default();
    config.cache.jitter = false;
    config
}

pub fn harness() -> Harness {
    let lock = FakeLockAdapter::new();
    let cache = FakeCacheBackend::new();
    let events = FakePublisher::new();
    let store = Store::in_memory();
    let clock = FakeClock::at(noon());
    let shop = Shop::new(
        ShopDeps {
            lock: lock.clone(),
            cache: cache.clone(),
            events: events.clone(),
            store: store.clone(),
        },
        &config(),
        clock.clone(),
        SequentialIdGen::new("op"),
    );
    Harness {
        shop,
        lock,
        cache,
        events,
        store,
        clock,
    }
}

impl Harness {
    pub fn user(&self, id: u64) -> UserId {
        let user = User::new(UserId(id), format!("user-{id}"));
        self.store.save_user(&user).unwrap();
        user.id
    }

    pub fn product(&self, id: u64, price: u64, stock: u32) -> ProductId {
        let product = Product::new(ProductId(id), format!("product-{id}"), Money(price), stock);
        self.store.save_product(&product).unwrap();
        product.id
    }

    /// A coupon open from an hour ago until a day from now
    pub fn coupon(&self, id: u64, percent: u8, max_issuance: u32) -> CouponId {
        let now = noon();
        let coupon = Coupon::new(
            CouponId(id),
            format!("CODE{id}"),
            format!("coupon-{id}"),
            DiscountRate::percent(percent).unwrap(),
            max_issuance,
            now - chrono::Duration::hours(1),
            now + chrono::Duration::days(1),
            now,
        );
        self.store.save_coupon(&coupon).unwrap();
        coupon.id
    }

    pub fn stock(&self, product: ProductId) -> (u32, u32) {
        let product = self.store.find_product(product).unwrap().unwrap();
        (product.stock, product.reserved_stock)
    }
}
