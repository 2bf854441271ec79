//! LRU eviction policy.
//!
//! When an insert of a new key finds a tier at capacity, a fixed fraction of
//! the tier is evicted in one batch, least-recently-used first.

use std::collections::HashMap;

use super::entry::CacheEntry;

/// Fraction of the tier evicted per eviction event.
pub const EVICTION_FRACTION: f64 = 0.25;

/// Capacity-bounded LRU eviction.
#[derive(Debug, Clone, Copy)]
pub struct LruEviction {
    capacity: usize,
}

impl LruEviction {
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether inserting one more key requires evicting first.
    #[inline]
    pub fn needs_eviction(&self, len: usize) -> bool {
        len >= self.capacity
    }

    /// Number of entries to evict from a tier holding `len` entries.
    ///
    /// Always at least one, and enough to bring the tier below capacity.
    pub fn batch_size(&self, len: usize) -> usize {
        let fraction = (len as f64 * EVICTION_FRACTION) as usize;
        let to_fit = (len + 1).saturating_sub(self.capacity);
        fraction.max(to_fit).max(1).min(len)
    }

    /// Keys to evict, oldest `last_accessed` first, ties broken by creation order.
    ///
    /// `incoming` is never selected.
    pub fn select_victims(&self, entries: &HashMap<String, CacheEntry>, incoming: &str) -> Vec<String> {
        let count = self.batch_size(entries.len());

        let mut candidates: Vec<(u64, u64, &str)> = entries
            .values()
            .filter(|entry| entry.key() != incoming)
            .map(|entry| (entry.last_accessed(), entry.created_stamp(), entry.key()))
            .collect();

        if count < candidates.len() {
            candidates.select_nth_unstable(count);
            candidates.truncate(count);
        }
        candidates.sort_unstable();

        candidates
            .into_iter()
            .map(|(_, _, key)| key.to_string())
            .collect()
    }
}
