//! Cache service: a `TieredCache` plus its background expiration sweeper.
//!
//! Built once at the composition root. The sweeper starts with the service
//! and stops when the service is shut down or dropped.

use log::info;
use std::sync::Arc;

use crate::cache::TieredCache;
use crate::config::CacheConfig;
use crate::error::CacheResult;
use crate::sweep::{SweepScheduler, SweeperHandle};

/// A running cache instance.
#[derive(Debug)]
pub struct CacheService {
    cache: TieredCache,
    sweeper: SweeperHandle,
}

impl CacheService {
    /// Build the tiers and start the sweeper on the current tokio runtime.
    ///
    /// Fails if the configuration is invalid, or if the sweeper is enabled
    /// and no tokio runtime is available.
    pub fn start(config: CacheConfig) -> CacheResult<Self> {
        let cache = TieredCache::new(config)?;
        let scheduler = Arc::new(SweepScheduler::new(
            cache.sweep_service(),
            cache.config().sweep.clone(),
        ));
        let sweeper = scheduler.spawn()?;

        info!(
            "Cache service started (fast: {} entries / {}s, durable: {} entries / {}s, codec: {})",
            cache.config().fast.capacity,
            cache.config().fast.default_ttl.as_secs(),
            cache.config().durable.capacity,
            cache.config().durable.default_ttl.as_secs(),
            cache.config().codec
        );

        Ok(Self { cache, sweeper })
    }

    /// The cache shared with consumers.
    pub fn cache(&self) -> &TieredCache {
        &self.cache
    }

    pub fn sweeper(&self) -> &SweeperHandle {
        &self.sweeper
    }

    /// Stop the background sweeper. Cached entries are left in place.
    pub fn shutdown(&self) {
        self.sweeper.stop();
    }
}

impl std::ops::Deref for CacheService {
    type Target = TieredCache;

    fn deref(&self) -> &TieredCache {
        &self.cache
    }
}
