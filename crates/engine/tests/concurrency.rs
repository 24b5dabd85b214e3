// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

//! Concurrent callers against real fair locks
//!
//! Each caller gets its own `Shop` and lock adapter, all over one lock
//! backend and one store, the way separate service instances would share a
//! lock server and a database.

use shop_adapters::{FairLockAdapter, MemoryCacheBackend, MemoryLockBackend, NoOpPublisher};
use shop_core::{
    Coupon, CouponError, CouponId, DiscountRate, InventoryError, LockConfig, Money, OrderError,
    OrderLine, OrderStatus, Product, ProductId, SystemClock, User, UserId, UuidIdGen,
};
use shop_engine::{Shop, ShopConfig, ShopDeps, ShopError};
use shop_storage::{
    BalanceRepository, CouponRepository, OrderRepository, ProductRepository, Store,
    UserRepository,
};
use std::time::Duration;

type LiveShop = Shop<
    FairLockAdapter<MemoryLockBackend<SystemClock>>,
    MemoryCacheBackend<SystemClock>,
    NoOpPublisher,
    Store,
    SystemClock,
    UuidIdGen,
>;

struct Cluster {
    store: Store,
    locks: MemoryLockBackend<SystemClock>,
}

impl Cluster {
    fn new() -> Self {
        Self {
            store: Store::in_memory(),
            locks: MemoryLockBackend::new(SystemClock),
        }
    }

    /// A fresh instance over the shared store and lock backend
    fn instance(&self) -> LiveShop {
        let mut config = ShopConfig::default();
        config.lock = LockConfig::default()
            .with_wait_time(Duration::from_secs(10))
            .with_poll_interval(Duration::from_millis(5));
        Shop::new(
            ShopDeps {
                lock: FairLockAdapter::new(self.locks.clone(), config.lock.clone()),
                cache: MemoryCacheBackend::new(SystemClock),
                events: NoOpPublisher::new(),
                store: self.store.clone(),
            },
            &config,
            SystemClock,
            UuidIdGen,
        )
    }

    fn users(&self, count: u64) -> Vec<UserId> {
        (1..=count)
            .map(|id| {
                let user = User::new(UserId(id), format!("user-{id}"));
                self.store.save_user(&user).unwrap();
                user.id
            })
            .collect()
    }

    fn coupon(&self, max_issuance: u32) -> CouponId {
        let now = chrono::Utc::now();
        let coupon = Coupon::new(
            CouponId(1),
            "RUSH",
            "rush hour",
            DiscountRate::percent(10).unwrap(),
            max_issuance,
            now - chrono::Duration::hours(1),
            now + chrono::Duration::days(1),
            now,
        );
        self.store.save_coupon(&coupon).unwrap();
        coupon.id
    }

    fn product(&self, id: u64, stock: u32) -> ProductId {
        let product = Product::new(ProductId(id), format!("product-{id}"), Money(100), stock);
        self.store.save_product(&product).unwrap();
        product.id
    }
}

// =============================================================================
// Coupon quota
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn one_unit_goes_to_exactly_one_of_two_users() {
    let cluster = Cluster::new();
    let users = cluster.users(2);
    let coupon = cluster.coupon(1);
    let (left, right) = (cluster.instance(), cluster.instance());

    let (a, b) = tokio::join!(
        left.issue_coupon(users[0], coupon),
        right.issue_coupon(users[1], coupon)
    );

    let results = [a, b];
    let issued = results.iter().filter(|r| r.is_ok()).count();
    let sold_out = results
        .iter()
        .filter(|r| matches!(r, Err(ShopError::Coupon(CouponError::OutOfStock { .. }))))
        .count();
    assert_eq!((issued, sold_out), (1, 1));
    assert_eq!(
        cluster.store.find_coupon(coupon).unwrap().unwrap().issued_count,
        1
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn issuance_never_exceeds_quota_under_contention() {
    const USERS: u64 = 40;
    const QUOTA: u32 = 10;

    let cluster = Cluster::new();
    let users = cluster.users(USERS);
    let coupon = cluster.coupon(QUOTA);

    let mut tasks = Vec::new();
    for user in users {
        let shop = cluster.instance();
        tasks.push(tokio::spawn(async move { shop.issue_coupon(user, coupon).await }));
    }

    let mut issued = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => issued += 1,
            Err(ShopError::Coupon(CouponError::OutOfStock { .. })) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(issued, QUOTA);
    assert_eq!(
        cluster.store.find_coupon(coupon).unwrap().unwrap().issued_count,
        QUOTA
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn repeated_requests_from_one_user_issue_once() {
    let cluster = Cluster::new();
    let user = cluster.users(1)[0];
    let coupon = cluster.coupon(100);

    let mut tasks = Vec::new();
    for _ in 0..10 {
        let shop = cluster.instance();
        tasks.push(tokio::spawn(async move { shop.issue_coupon(user, coupon).await }));
    }

    let mut issued = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => issued += 1,
            Err(ShopError::Coupon(CouponError::AlreadyIssued { .. })) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(issued, 1);
    assert_eq!(
        cluster.store.find_coupon(coupon).unwrap().unwrap().issued_count,
        1
    );
}

// =============================================================================
// Inventory
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn stock_is_never_oversold() {
    const BUYERS: u64 = 30;
    const STOCK: u32 = 10;

    let cluster = Cluster::new();
    let users = cluster.users(BUYERS);
    let lamp = cluster.product(1, STOCK);

    let mut tasks = Vec::new();
    for user in users {
        let shop = cluster.instance();
        tasks.push(tokio::spawn(async move {
            shop.create_order(user, &[OrderLine::new(lamp, 1)]).await
        }));
    }

    let mut created = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => created += 1,
            Err(ShopError::Inventory(InventoryError::OutOfStock { .. })) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(created, STOCK);
    let product = cluster.store.find_product(lamp).unwrap().unwrap();
    assert_eq!((product.stock, product.reserved_stock), (STOCK, STOCK));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn overlapping_orders_in_any_line_order_never_deadlock() {
    let cluster = Cluster::new();
    let users = cluster.users(20);
    let products: Vec<ProductId> = (1..=4).map(|id| cluster.product(id, 1_000)).collect();

    let mut tasks = Vec::new();
    for (n, user) in users.into_iter().enumerate() {
        // Every caller lists the products in a different rotation
        let mut lines: Vec<OrderLine> = products.iter().map(|p| OrderLine::new(*p, 1)).collect();
        lines.rotate_left(n % products.len());
        if n % 2 == 1 {
            lines.reverse();
        }
        let shop = cluster.instance();
        tasks.push(tokio::spawn(async move { shop.create_order(user, &lines).await }));
    }

    let all = tokio::time::timeout(Duration::from_secs(30), async {
        for task in tasks {
            task.await.unwrap().unwrap();
        }
    })
    .await;

    assert!(all.is_ok(), "orders did not finish, lock cycle suspected");
    for product in products {
        let product = cluster.store.find_product(product).unwrap().unwrap();
        assert_eq!(product.reserved_stock, 20);
    }
}

// =============================================================================
// Payment
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_payments_of_one_order_charge_once() {
    let cluster = Cluster::new();
    let user = cluster.users(1)[0];
    let lamp = cluster.product(1, 10);
    let shop = cluster.instance();
    shop.charge_balance(user, Money(10_000)).await.unwrap();
    let order = shop
        .create_order(user, &[OrderLine::new(lamp, 2)])
        .await
        .unwrap();

    let mut tasks = Vec::new();
    for _ in 0..5 {
        let shop = cluster.instance();
        tasks.push(tokio::spawn(
            async move { shop.pay_order(user, order.id, None).await },
        ));
    }

    let mut paid = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => paid += 1,
            Err(ShopError::Order(OrderError::AlreadyPaid { .. })) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(paid, 1);
    let balance = cluster.store.find_balance(user).unwrap().unwrap();
    assert_eq!(balance.amount, Money(9_800));
    let product = cluster.store.find_product(lamp).unwrap().unwrap();
    assert_eq!((product.stock, product.reserved_stock), (8, 0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn payment_and_cancellation_race_has_one_winner() {
    let cluster = Cluster::new();
    let user = cluster.users(1)[0];
    let lamp = cluster.product(1, 10);
    let shop = cluster.instance();
    shop.charge_balance(user, Money(10_000)).await.unwrap();
    let order = shop
        .create_order(user, &[OrderLine::new(lamp, 3)])
        .await
        .unwrap();

    let (payer, canceller) = (cluster.instance(), cluster.instance());
    let (paid, cancelled) = tokio::join!(
        payer.pay_order(user, order.id, None),
        canceller.cancel_order(user, order.id)
    );

    assert!(paid.is_ok() != cancelled.is_ok(), "exactly one side wins");
    let stored = cluster.store.find_order(order.id).unwrap().unwrap();
    let product = cluster.store.find_product(lamp).unwrap().unwrap();
    match stored.status {
        OrderStatus::Completed => assert_eq!((product.stock, product.reserved_stock), (7, 0)),
        OrderStatus::Cancelled => assert_eq!((product.stock, product.reserved_stock), (10, 0)),
        other => panic!("order left {other}"),
    }
}
