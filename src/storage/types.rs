//! Storage statistics types.

use serde::Serialize;

use crate::types::Tier;

/// Counters for a single tier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TierStats {
    /// Tier these counters belong to
    pub tier: Tier,
    /// Entries currently held, expired or not
    pub entries: usize,
    /// Configured capacity
    pub capacity: usize,
    /// Reads that returned a value
    pub hits: u64,
    /// Reads that found nothing, an expired entry, or a corrupt entry
    pub misses: u64,
    /// Number of eviction events
    pub total_evictions: u64,
    /// Number of entries removed by eviction
    pub total_evicted: u64,
    /// Expired entries removed by reads or sweeps
    pub expired_removed: u64,
    /// Entries purged because they failed to decode
    pub corrupt_removed: u64,
}

impl TierStats {
    /// Conventional hits / (hits + misses).
    pub fn lookup_hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}
