//! Cache configuration.
//!
//! Every setting has a default; `CacheConfig::from_env()` overlays values
//! from `TIER_CACHE_*` environment variables on top of those defaults.

use std::str::FromStr;
use std::time::Duration;

use crate::error::{CacheError, CacheResult};
use crate::storage::EntryCodec;
use crate::types::Tier;

/// Longest accepted interval for periodic work (sweeps, reports).
pub const MAX_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Capacity and TTL settings for a single tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierConfig {
    /// Maximum number of entries before LRU eviction kicks in
    pub capacity: usize,
    /// TTL applied when a caller does not provide one
    pub default_ttl: Duration,
}

impl TierConfig {
    pub fn new(capacity: usize, default_ttl: Duration) -> Self {
        Self {
            capacity,
            default_ttl,
        }
    }

    /// Defaults for the given tier.
    pub fn for_tier(tier: Tier) -> Self {
        match tier {
            // Fast tier: small and short-lived
            Tier::Fast => Self::new(1_000, Duration::from_secs(5 * 60)),
            Tier::Durable => Self::new(10_000, Duration::from_secs(60 * 60)),
        }
    }

    fn validate(&self, tier: Tier) -> CacheResult<()> {
        if self.capacity == 0 {
            return Err(CacheError::InvalidConfig(format!(
                "{} tier capacity must be greater than zero",
                tier
            )));
        }
        if self.default_ttl.is_zero() {
            return Err(CacheError::InvalidConfig(format!(
                "{} tier default ttl must be greater than zero",
                tier
            )));
        }
        Ok(())
    }
}

/// Configuration for the background expiration sweeper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepConfig {
    /// Interval between sweep passes
    pub interval: Duration,
    /// Whether the sweeper is started with the service
    pub enabled: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            enabled: true,
        }
    }
}

/// Top-level cache configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub fast: TierConfig,
    pub durable: TierConfig,
    pub sweep: SweepConfig,
    /// Serialization scheme shared by both tiers
    pub codec: EntryCodec,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            fast: TierConfig::for_tier(Tier::Fast),
            durable: TierConfig::for_tier(Tier::Durable),
            sweep: SweepConfig::default(),
            codec: EntryCodec::default(),
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration of one tier.
    pub fn with_tier(mut self, tier: Tier, config: TierConfig) -> Self {
        match tier {
            Tier::Fast => self.fast = config,
            Tier::Durable => self.durable = config,
        }
        self
    }

    /// Set the sweep interval.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep.interval = interval;
        self
    }

    /// Enable or disable the background sweeper.
    pub fn with_sweep_enabled(mut self, enabled: bool) -> Self {
        self.sweep.enabled = enabled;
        self
    }

    pub fn with_codec(mut self, codec: EntryCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Returns the configuration of one tier.
    pub fn tier(&self, tier: Tier) -> &TierConfig {
        match tier {
            Tier::Fast => &self.fast,
            Tier::Durable => &self.durable,
        }
    }

    pub fn validate(&self) -> CacheResult<()> {
        self.fast.validate(Tier::Fast)?;
        self.durable.validate(Tier::Durable)?;
        check_interval("sweep interval", self.sweep.interval)
    }

    /// Builds a configuration from defaults overlaid with environment variables.
    ///
    /// Recognised variables:
    /// - `TIER_CACHE_FAST_CAPACITY`, `TIER_CACHE_FAST_TTL_SECS`
    /// - `TIER_CACHE_DURABLE_CAPACITY`, `TIER_CACHE_DURABLE_TTL_SECS`
    /// - `TIER_CACHE_SWEEP_INTERVAL_SECS`, `TIER_CACHE_SWEEP_ENABLED`
    /// - `TIER_CACHE_CODEC` (`json` or `bincode`)
    pub fn from_env() -> CacheResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> CacheResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(capacity) = parse_var::<usize>(&lookup, "TIER_CACHE_FAST_CAPACITY")? {
            config.fast.capacity = capacity;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "TIER_CACHE_FAST_TTL_SECS")? {
            config.fast.default_ttl = Duration::from_secs(secs);
        }
        if let Some(capacity) = parse_var::<usize>(&lookup, "TIER_CACHE_DURABLE_CAPACITY")? {
            config.durable.capacity = capacity;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "TIER_CACHE_DURABLE_TTL_SECS")? {
            config.durable.default_ttl = Duration::from_secs(secs);
        }
        if let Some(interval) = interval_var(&lookup, "TIER_CACHE_SWEEP_INTERVAL_SECS")? {
            config.sweep.interval = interval;
        }
        if let Some(enabled) = parse_var::<bool>(&lookup, "TIER_CACHE_SWEEP_ENABLED")? {
            config.sweep.enabled = enabled;
        }
        if let Some(codec) = parse_var::<EntryCodec>(&lookup, "TIER_CACHE_CODEC")? {
            config.codec = codec;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Reads an interval in whole seconds, between 1s and `MAX_INTERVAL`.
///
/// Returns `Ok(None)` when the variable is unset.
pub fn interval_var(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> CacheResult<Option<Duration>> {
    match parse_var::<u64>(lookup, name)? {
        Some(secs) => {
            let interval = Duration::from_secs(secs);
            check_interval(name, interval)?;
            Ok(Some(interval))
        }
        None => Ok(None),
    }
}

fn check_interval(name: &str, interval: Duration) -> CacheResult<()> {
    if interval.is_zero() || interval > MAX_INTERVAL {
        return Err(CacheError::InvalidConfig(format!(
            "{} must be between 1s and {}s, got {}s",
            name,
            MAX_INTERVAL.as_secs(),
            interval.as_secs()
        )));
    }
    Ok(())
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> CacheResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| CacheError::InvalidConfig(format!("{}='{}': {}", name, raw, e))),
        None => Ok(None),
    }
}
