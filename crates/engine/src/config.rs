// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine configuration, loaded from TOML
//!
//! ```toml
//! state_dir = "/var/lib/shopd"
//!
//! [lock]
//! wait_time = "5s"
//! lease_time = "10s"
//!
//! [cache]
//! jitter = true
//!
//! [cache.ttl]
//! user_balance = "1m"
//!
//! [outbox]
//! initial_delay = "1s"
//! max_retries = 5
//!
//! [sweep]
//! retry_interval = "30s"
//! ```
//!
//! Every section and key is optional.

use serde::{Deserialize, Serialize};
use shop_core::{CacheTtl, LockConfig, RetryPolicy};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopConfig {
    /// Where the daemon keeps its WAL and logs
    pub state_dir: Option<PathBuf>,
    pub lock: LockConfig,
    pub cache: CacheConfig,
    pub outbox: RetryPolicy,
    pub sweep: SweepConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Spread stored TTLs by up to 10% either way
    pub jitter: bool,
    pub ttl: CacheTtl,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            jitter: true,
            ttl: CacheTtl::default(),
        }
    }
}

/// How often the daemon's background sweeps run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    #[serde(with = "humantime_serde")]
    pub retry_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub expiry_interval: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            retry_interval: Duration::from_secs(30),
            expiry_interval: Duration::from_secs(60),
        }
    }
}

impl ShopConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load from `path`; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml_str(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
