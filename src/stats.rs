//! Point-in-time statistics over both tiers.

use serde::Serialize;
use std::sync::Arc;
use tokio::time::Instant;

use crate::storage::{TierStats, TierStore};
use crate::types::Tier;

/// Fixed per-entry overhead added to the memory estimate.
pub const ENTRY_OVERHEAD_BYTES: usize = 64;

/// Number of keys reported in `top_keys`.
pub const TOP_KEYS_LIMIT: usize = 10;

/// Access-count-weighted ratio for each tier.
///
/// Computed as `entry_count / total_access_count`, which is not the usual
/// hits / (hits + misses). For that, see `TierStats::lookup_hit_rate`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct HitRatios {
    pub fast: f64,
    pub durable: f64,
}

/// One of the most-accessed keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyAccess {
    pub key: String,
    pub tier: Tier,
    pub access_count: u64,
}

/// Snapshot of both tiers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsSnapshot {
    /// Entries in the fast tier
    pub memory_size: usize,
    /// Entries in the durable tier
    pub persistent_size: usize,
    pub hit_ratios: HitRatios,
    /// Sum of key and encoded data lengths plus fixed overhead, both tiers
    pub memory_estimate_bytes: usize,
    /// Entries past expiry that have not been swept yet
    pub expired_count: usize,
    /// Most-accessed keys across both tiers, highest first
    pub top_keys: Vec<KeyAccess>,
    pub fast: TierStats,
    pub durable: TierStats,
}

/// Per-tier figures gathered under one shared lock.
struct TierScan {
    entries: usize,
    total_accesses: u64,
    memory_bytes: usize,
    expired: usize,
    keys: Vec<KeyAccess>,
}

/// Read-only aggregation over both tier stores.
#[derive(Debug, Clone)]
pub struct StatisticsCollector {
    fast: Arc<TierStore>,
    durable: Arc<TierStore>,
}

impl StatisticsCollector {
    pub fn new(fast: Arc<TierStore>, durable: Arc<TierStore>) -> Self {
        Self { fast, durable }
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        let now = Instant::now();
        let fast = scan(&self.fast, now);
        let durable = scan(&self.durable, now);

        let mut top_keys: Vec<KeyAccess> = fast.keys.into_iter().chain(durable.keys).collect();
        top_keys.sort_by(|a, b| {
            b.access_count
                .cmp(&a.access_count)
                .then_with(|| a.key.cmp(&b.key))
                .then_with(|| a.tier.cmp(&b.tier))
        });
        top_keys.truncate(TOP_KEYS_LIMIT);

        StatisticsSnapshot {
            memory_size: fast.entries,
            persistent_size: durable.entries,
            hit_ratios: HitRatios {
                fast: access_ratio(fast.entries, fast.total_accesses),
                durable: access_ratio(durable.entries, durable.total_accesses),
            },
            memory_estimate_bytes: fast.memory_bytes + durable.memory_bytes,
            expired_count: fast.expired + durable.expired,
            top_keys,
            fast: self.fast.stats(),
            durable: self.durable.stats(),
        }
    }
}

fn scan(store: &TierStore, now: Instant) -> TierScan {
    store.inspect(|entries| {
        let mut scan = TierScan {
            entries: entries.len(),
            total_accesses: 0,
            memory_bytes: 0,
            expired: 0,
            keys: Vec::with_capacity(entries.len()),
        };
        for entry in entries.values() {
            let access_count = entry.access_count();
            scan.total_accesses += access_count;
            scan.memory_bytes += entry.payload_size() + ENTRY_OVERHEAD_BYTES;
            if entry.is_expired_at(now) {
                scan.expired += 1;
            }
            scan.keys.push(KeyAccess {
                key: entry.key().to_string(),
                tier: entry.tier(),
                access_count,
            });
        }
        scan
    })
}

/// `entries / total_accesses`, 0.0 when nothing has been accessed.
fn access_ratio(entries: usize, total_accesses: u64) -> f64 {
    if total_accesses == 0 {
        0.0
    } else {
        entries as f64 / total_accesses as f64
    }
}
