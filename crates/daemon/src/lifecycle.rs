// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, background sweeps, shutdown.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs2::FileExt;
use shop_adapters::{
    ChannelPublisher, Delivery, FairLockAdapter, MemoryCacheBackend, MemoryLockBackend,
    TracedCacheBackend, TracedEventPort, TracedLock,
};
use shop_core::{SystemClock, UuidIdGen};
use shop_engine::{ConfigError, Shop, ShopConfig, ShopDeps};
use shop_storage::{Store, StoreError};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Shop with the daemon's concrete adapters (wrapped with tracing)
pub type DaemonShop = Shop<
    TracedLock<FairLockAdapter<MemoryLockBackend<SystemClock>>>,
    TracedCacheBackend<MemoryCacheBackend<SystemClock>>,
    TracedEventPort<ChannelPublisher>,
    Store,
    SystemClock,
    UuidIdGen,
>;

/// Events buffered between the shop and the stream consumer
const STREAM_CAPACITY: usize = 1024;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the WAL, lock file and log
    pub state_dir: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Path to the write-ahead log
    pub wal_path: PathBuf,
    pub shop: ShopConfig,
}

impl Config {
    /// Load `shop.toml` from `path` and resolve the state directory
    ///
    /// The directory comes from `state_dir` in the file, then the
    /// `SHOPD_STATE_DIR` environment variable, then the platform data dir.
    pub fn load(path: &Path) -> Result<Self, LifecycleError> {
        let shop = ShopConfig::load(path)?;
        let state_dir = match &shop.state_dir {
            Some(dir) => dir.clone(),
            None => default_state_dir()?,
        };
        Ok(Self::for_state_dir(state_dir, shop))
    }

    pub fn for_state_dir(state_dir: PathBuf, shop: ShopConfig) -> Self {
        Self {
            lock_path: state_dir.join("shopd.pid"),
            log_path: state_dir.join("shopd.log"),
            wal_path: state_dir.join("wal").join("shop.wal"),
            state_dir,
            shop,
        }
    }
}

fn default_state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("SHOPD_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::data_local_dir()
        .map(|dir| dir.join("shopd"))
        .ok_or(LifecycleError::NoStateDir)
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Daemon state during operation
pub struct DaemonState {
    pub config: Config,
    // Held to maintain exclusive file lock; released on drop
    lock_file: File,
    pub shop: DaemonShop,
    /// Lock table shared by every adapter in this process
    pub locks: MemoryLockBackend<SystemClock>,
    consumer: JoinHandle<()>,
    pub start_time: Instant,
}

impl DaemonState {
    /// Re-publish failed outbox rows that are due
    pub async fn retry_sweep(&self) {
        match self.shop.retry_failed_events().await {
            Ok(report) if report.failed > 0 => {
                warn!(failed = report.failed, "outbox retry left events failed")
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "outbox retry sweep failed"),
        }
    }

    /// Expire coupons past their end
    pub async fn expiry_sweep(&self) {
        if let Err(e) = self.shop.expire_coupons().await {
            warn!(error = %e, "coupon expiry sweep failed");
        }
    }

    /// Reclaim expired lock leases
    pub fn tick_locks(&self) {
        self.locks.tick();
    }

    /// Shutdown the daemon gracefully
    pub async fn shutdown(self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");

        let DaemonState {
            config,
            lock_file,
            shop,
            consumer,
            start_time,
            ..
        } = self;
        // The consumer holds its own shop clone, so the stream never closes by itself
        consumer.abort();
        drop(shop);

        if config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&config.lock_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }
        drop(lock_file);

        info!(
            uptime_secs = start_time.elapsed().as_secs(),
            "Daemon shutdown complete"
        );
        Ok(())
    }
}

/// Start the daemon
pub async fn startup(config: &Config) -> Result<DaemonState, LifecycleError> {
    match startup_inner(config).await {
        Ok(state) => Ok(state),
        Err(e) => {
            cleanup_on_failure(config, &e);
            Err(e)
        }
    }
}

async fn startup_inner(config: &Config) -> Result<DaemonState, LifecycleError> {
    // 1. Create state directory
    std::fs::create_dir_all(&config.state_dir)?;

    // 2. Acquire lock file FIRST - prevents two daemons sharing one WAL
    // Open without truncating so a running daemon's PID survives a failed attempt
    let mut lock_file = std::fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;

    use std::io::Write;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    // 3. Rebuild state from the WAL
    let store = Store::open(&config.wal_path)?;
    let snapshot = store.snapshot();
    info!(
        users = snapshot.users.len(),
        products = snapshot.products.len(),
        coupons = snapshot.coupons.len(),
        orders = snapshot.orders.len(),
        events = snapshot.event_logs.len(),
        "Loaded state"
    );

    // 4. Adapters, wrapped with tracing
    let clock = SystemClock;
    let locks = MemoryLockBackend::new(clock);
    let (publisher, deliveries) = ChannelPublisher::new(STREAM_CAPACITY);
    let shop = Shop::new(
        ShopDeps {
            lock: TracedLock::new(FairLockAdapter::new(locks.clone(), config.shop.lock.clone())),
            cache: TracedCacheBackend::new(MemoryCacheBackend::new(clock)),
            events: TracedEventPort::new(publisher),
            store,
        },
        &config.shop,
        clock,
        UuidIdGen,
    );

    // 5. Stream consumer: acknowledges what it receives
    let consumer = tokio::spawn(consume(shop.clone(), deliveries));

    info!(state_dir = %config.state_dir.display(), "Daemon started");

    Ok(DaemonState {
        config: config.clone(),
        lock_file,
        shop,
        locks,
        consumer,
        start_time: Instant::now(),
    })
}

/// Acknowledgement attempts per delivery
const ACK_ATTEMPTS: u32 = 5;
const ACK_BACKOFF: Duration = Duration::from_millis(20);

/// Drain the event stream, marking each delivered event COMPLETED
pub async fn consume(shop: DaemonShop, mut deliveries: mpsc::Receiver<Delivery>) {
    while let Some(delivery) = deliveries.recv().await {
        acknowledge(&shop, &delivery).await;
    }
}

// A delivery can overtake the outbox storing PUBLISHED, so a rejected
// acknowledgement is retried briefly before giving up.
async fn acknowledge(shop: &DaemonShop, delivery: &Delivery) {
    let id = delivery.event.event_log_id;
    let mut attempt = 1;
    loop {
        match shop.complete_event(id) {
            Ok(()) => {
                debug!(topic = %delivery.topic, event_log_id = %id, "event consumed");
                return;
            }
            Err(e) if attempt < ACK_ATTEMPTS => {
                debug!(event_log_id = %id, attempt, error = %e, "acknowledgement rejected, retrying");
                attempt += 1;
                tokio::time::sleep(ACK_BACKOFF).await;
            }
            Err(e) => {
                warn!(topic = %delivery.topic, event_log_id = %id, error = %e, "failed to acknowledge event");
                return;
            }
        }
    }
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &Config, error: &LifecycleError) {
    // Another daemon owns the lock file; leave it alone
    if matches!(error, LifecycleError::LockFailed(_)) {
        return;
    }
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
