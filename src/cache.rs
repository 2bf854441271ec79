//! Two-tier cache with cache-aside loading.
//!
//! `TieredCache` is the single entry point callers use. It owns the fast and
//! durable tier stores and coordinates lookups across them:
//!
//! - **MemoryFirst**: fast → durable (promote hit into fast) → loader (populate fast)
//! - **PersistentFirst**: durable → fast → loader (populate durable), never promotes
//! - **MemoryOnly** / **PersistentOnly**: one tier, then the loader, populating that tier
//!
//! The loader runs at most once per `get_or_load` call. Concurrent misses on
//! the same key are not coalesced: each caller may run its own loader and
//! the last write wins.

use log::warn;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::CacheConfig;
use crate::error::CacheResult;
use crate::stats::{StatisticsCollector, StatisticsSnapshot};
use crate::storage::TierStore;
use crate::sweep::SweepService;
use crate::types::Tier;
use crate::warmup::{WarmupCoordinator, WarmupItem, WarmupReport};

/// Lookup order for `get_or_load`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FallbackStrategy {
    /// Fast tier, then durable tier with promotion, then loader
    #[default]
    MemoryFirst,
    /// Durable tier, then fast tier, then loader
    PersistentFirst,
    /// Fast tier only
    MemoryOnly,
    /// Durable tier only
    PersistentOnly,
}

impl FallbackStrategy {
    /// Tier a loaded value is written to.
    pub fn home_tier(&self) -> Tier {
        match self {
            FallbackStrategy::MemoryFirst | FallbackStrategy::MemoryOnly => Tier::Fast,
            FallbackStrategy::PersistentFirst | FallbackStrategy::PersistentOnly => Tier::Durable,
        }
    }
}

/// The two-tier cache.
///
/// Constructed once at the composition root and shared (behind `Arc`) with
/// every consumer. Cloning is cheap and clones share the same tiers.
#[derive(Debug, Clone)]
pub struct TieredCache {
    fast: Arc<TierStore>,
    durable: Arc<TierStore>,
    config: CacheConfig,
}

impl TieredCache {
    pub fn new(config: CacheConfig) -> CacheResult<Self> {
        config.validate()?;
        Ok(Self {
            fast: Arc::new(TierStore::new(Tier::Fast, config.fast.clone(), config.codec)),
            durable: Arc::new(TierStore::new(Tier::Durable, config.durable.clone(), config.codec)),
            config,
        })
    }

    pub fn with_defaults() -> Self {
        let config = CacheConfig::default();
        Self {
            fast: Arc::new(TierStore::new(Tier::Fast, config.fast.clone(), config.codec)),
            durable: Arc::new(TierStore::new(Tier::Durable, config.durable.clone(), config.codec)),
            config,
        }
    }

    // ============================================================================================
    // ACCESSORS
    // ============================================================================================

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// The store backing one tier.
    pub fn store(&self, tier: Tier) -> &Arc<TierStore> {
        match tier {
            Tier::Fast => &self.fast,
            Tier::Durable => &self.durable,
        }
    }

    // ============================================================================================
    // DIRECT ACCESS
    // ============================================================================================

    /// Get a value from the fast tier.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.fast.get(key)
    }

    /// Get a value from a specific tier.
    pub fn get_from<T: DeserializeOwned>(&self, tier: Tier, key: &str) -> Option<T> {
        self.store(tier).get(key)
    }

    /// Store a value in the fast tier. `ttl` defaults to the fast tier's TTL.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Option<Duration>) -> CacheResult<()> {
        self.fast.set(key, value, ttl)
    }

    /// Store a value in a specific tier.
    pub fn set_in<T: Serialize + ?Sized>(
        &self,
        tier: Tier,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> CacheResult<()> {
        self.store(tier).set(key, value, ttl)
    }

    /// Whether a live entry for `key` exists in `tier`. Not counted as an access.
    pub fn contains(&self, tier: Tier, key: &str) -> bool {
        self.store(tier).contains(key)
    }

    /// Remove `key` from both tiers; true if either held it.
    pub fn remove(&self, key: &str) -> bool {
        let in_fast = self.fast.remove(key);
        let in_durable = self.durable.remove(key);
        in_fast || in_durable
    }

    pub fn remove_from(&self, tier: Tier, key: &str) -> bool {
        self.store(tier).remove(key)
    }

    /// Remove every entry from both tiers.
    pub fn clear(&self) {
        self.fast.clear();
        self.durable.clear();
    }

    /// Remove every key containing `pattern` from both tiers.
    ///
    /// Returns the total number of entries removed.
    pub fn invalidate(&self, pattern: &str) -> usize {
        self.fast.remove_where(|key| key.contains(pattern))
            + self.durable.remove_where(|key| key.contains(pattern))
    }

    /// Remove every key matching `pattern` from both tiers.
    pub fn invalidate_matching(&self, pattern: &Regex) -> usize {
        self.fast.remove_where(|key| pattern.is_match(key))
            + self.durable.remove_where(|key| pattern.is_match(key))
    }

    // ============================================================================================
    // CACHE-ASIDE
    // ============================================================================================

    /// Get a value following `strategy`, invoking `loader` on a full miss.
    ///
    /// # Arguments
    /// - `key`: Key to look up in the tiers named by `strategy`
    /// - `strategy`: Tier order, and the tier a loaded value is written to
    /// - `loader`: Called at most once, only when every consulted tier misses
    ///
    /// # Returns
    /// The cached or loaded value, or `None` if the loader found nothing.
    /// A loaded `Some` value is written to the strategy's home tier with that
    /// tier's default TTL. Loader errors are returned unchanged; a failure to
    /// write the loaded value back is logged and the value is still returned.
    ///
    /// # Example
    /// ```rust,no_run
    /// use tiercache::{FallbackStrategy, TieredCache};
    ///
    /// # async fn lookup_rate(cache: TieredCache) -> Result<(), String> {
    /// let rate_bps: Option<u32> = cache
    ///     .get_or_load("tax:region:7", FallbackStrategy::MemoryFirst, || async {
    ///         // Query the tax service here
    ///         Ok::<_, String>(Some(825))
    ///     })
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get_or_load<T, E, F, Fut>(
        &self,
        key: &str,
        strategy: FallbackStrategy,
        loader: F,
    ) -> Result<Option<T>, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
    {
        if let Some(value) = self.lookup(key, strategy) {
            return Ok(Some(value));
        }

        let loaded = loader().await?;
        if let Some(value) = &loaded {
            self.write_back(strategy.home_tier(), key, value);
        }
        Ok(loaded)
    }

    /// Tier lookups for `strategy`, including promotion. No loader.
    pub fn lookup<T>(&self, key: &str, strategy: FallbackStrategy) -> Option<T>
    where
        T: Serialize + DeserializeOwned,
    {
        match strategy {
            FallbackStrategy::MemoryFirst => {
                if let Some(value) = self.fast.get(key) {
                    return Some(value);
                }
                let value = self.durable.get(key)?;
                self.write_back(Tier::Fast, key, &value);
                Some(value)
            }
            FallbackStrategy::PersistentFirst => {
                self.durable.get(key).or_else(|| self.fast.get(key))
            }
            FallbackStrategy::MemoryOnly => self.fast.get(key),
            FallbackStrategy::PersistentOnly => self.durable.get(key),
        }
    }

    fn write_back<T: Serialize>(&self, tier: Tier, key: &str, value: &T) {
        if let Err(e) = self.store(tier).set(key, value, None) {
            warn!("Failed to write '{}' into {} tier: {}", key, tier, e);
        }
    }

    // ============================================================================================
    // PEERS
    // ============================================================================================

    /// Point-in-time statistics over both tiers.
    pub fn statistics(&self) -> StatisticsSnapshot {
        self.statistics_collector().snapshot()
    }

    pub fn statistics_collector(&self) -> StatisticsCollector {
        StatisticsCollector::new(Arc::clone(&self.fast), Arc::clone(&self.durable))
    }

    /// Pre-populate tiers from a batch of loaders; see `WarmupCoordinator`.
    pub async fn warmup(&self, items: Vec<WarmupItem>) -> WarmupReport {
        self.warmup_coordinator().warmup(items).await
    }

    pub fn warmup_coordinator(&self) -> WarmupCoordinator {
        WarmupCoordinator::new(Arc::clone(&self.fast), Arc::clone(&self.durable))
    }

    pub fn sweep_service(&self) -> SweepService {
        SweepService::new(Arc::clone(&self.fast), Arc::clone(&self.durable))
    }
}
