//! # tiercache
//!
//! In-process two-tier cache for the retail point-of-sale backend.
//!
//! Business services (sales, tax and discount rules, dashboards,
//! configuration lookup) reach cached data only through [`TieredCache`]:
//! `get`, `set`, `get_or_load`, `invalidate`, `clear`, `warmup`, and
//! `statistics`.
//!
//! ## Components
//! - [`storage`]: tier stores, entries, codec, LRU eviction
//! - [`sweep`]: on-demand and scheduled expiration sweeping
//! - [`cache`]: cache-aside orchestration across tiers
//! - [`stats`]: point-in-time statistics
//! - [`warmup`]: concurrent startup population
//! - [`service`]: composition of the cache and its sweeper

pub mod cache;
pub mod config;
pub mod error;
pub mod service;
pub mod stats;
pub mod storage;
pub mod sweep;
pub mod types;
pub mod warmup;

pub use cache::{FallbackStrategy, TieredCache};
pub use config::{CacheConfig, SweepConfig, TierConfig, MAX_INTERVAL};
pub use error::{CacheError, CacheResult};
pub use service::CacheService;
pub use stats::{HitRatios, KeyAccess, StatisticsCollector, StatisticsSnapshot};
pub use storage::{EntryCodec, TierStats, TierStore};
pub use sweep::{SweepScheduler, SweepService, SweepStats, SweeperHandle};
pub use types::Tier;
pub use warmup::{WarmupCoordinator, WarmupItem, WarmupReport};
