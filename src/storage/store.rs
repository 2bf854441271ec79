//! Per-tier concurrent key → entry store.

use log::{debug, warn};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;

use super::codec::EntryCodec;
use super::entry::CacheEntry;
use super::eviction::LruEviction;
use super::types::TierStats;
use crate::config::TierConfig;
use crate::error::{CacheError, CacheResult};
use crate::types::{AccessClock, Tier};

/// Result of looking a key up under the shared lock.
enum Lookup<T> {
    Hit(T),
    Missing,
    Expired { revision: u64 },
    Corrupt { revision: u64, error: CacheError },
}

/// One cache tier: a capacity-bounded map of encoded entries.
///
/// # Thread Safety
/// - Reads take a shared lock; access bookkeeping is atomic on the entry
/// - Inserts, removals, and eviction take the exclusive lock
/// - Eviction runs inside the inserting call, so the tier never holds more
///   than `capacity` entries once `set` returns
pub struct TierStore {
    tier: Tier,
    config: TierConfig,
    codec: EntryCodec,
    eviction: LruEviction,
    entries: RwLock<HashMap<String, CacheEntry>>,
    clock: AccessClock,

    hits: AtomicU64,
    misses: AtomicU64,
    total_evictions: AtomicU64,
    total_evicted: AtomicU64,
    expired_removed: AtomicU64,
    corrupt_removed: AtomicU64,
}

impl std::fmt::Debug for TierStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TierStore")
            .field("tier", &self.tier)
            .field("capacity", &self.config.capacity)
            .field("entries", &self.entries.read().len())
            .finish()
    }
}

impl TierStore {
    pub fn new(tier: Tier, config: TierConfig, codec: EntryCodec) -> Self {
        Self {
            tier,
            eviction: LruEviction::new(config.capacity),
            entries: RwLock::new(HashMap::with_capacity(config.capacity.min(4096))),
            config,
            codec,
            clock: AccessClock::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            total_evictions: AtomicU64::new(0),
            total_evicted: AtomicU64::new(0),
            expired_removed: AtomicU64::new(0),
            corrupt_removed: AtomicU64::new(0),
        }
    }

    /// Store with the tier's default configuration and JSON encoding.
    pub fn with_capacity(tier: Tier, capacity: usize) -> Self {
        let mut config = TierConfig::for_tier(tier);
        config.capacity = capacity;
        Self::new(tier, config, EntryCodec::default())
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    pub fn default_ttl(&self) -> Duration {
        self.config.default_ttl
    }

    pub fn codec(&self) -> EntryCodec {
        self.codec
    }

    /// Entries physically held, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Get and decode a value.
    ///
    /// Expired entries read as absent. An entry that fails to decode is
    /// purged and reads as absent; it is never surfaced as an error.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let lookup = {
            let entries = self.entries.read();
            match entries.get(key) {
                None => Lookup::Missing,
                Some(entry) if entry.is_expired() => Lookup::Expired {
                    revision: entry.revision(),
                },
                Some(entry) => match self.codec.decode::<T>(entry.data()) {
                    Ok(value) => {
                        entry.mark_accessed(self.clock.stamp());
                        Lookup::Hit(value)
                    }
                    Err(error) => Lookup::Corrupt {
                        revision: entry.revision(),
                        error,
                    },
                },
            }
        };

        match lookup {
            Lookup::Hit(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(value);
            }
            Lookup::Missing => {}
            Lookup::Expired { revision } => {
                if self.remove_revision(key, revision) {
                    self.expired_removed.fetch_add(1, Ordering::Relaxed);
                }
            }
            Lookup::Corrupt { revision, error } => {
                warn!(
                    "Purging undecodable {} cache entry '{}': {}",
                    self.tier, key, error
                );
                if self.remove_revision(key, revision) {
                    self.corrupt_removed.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Encode and store a value, evicting first if the tier is full.
    ///
    /// # Arguments
    /// - `key`: Caller-chosen key, e.g. `"user:1"`
    /// - `value`: Value to encode with the store's codec
    /// - `ttl`: Lifetime of the entry; `None` uses the tier's default TTL.
    ///   TTLs beyond `MAX_TTL` are clamped to it.
    ///
    /// # Returns
    /// `Ok(())` once the entry is stored. `InvalidTtl` for a zero TTL and
    /// `Serialization` if the value cannot be encoded; the tier is unchanged
    /// in both cases.
    ///
    /// # Example
    /// ```rust,no_run
    /// use std::time::Duration;
    /// use tiercache::storage::TierStore;
    /// use tiercache::Tier;
    ///
    /// let store = TierStore::with_capacity(Tier::Fast, 1_000);
    /// store.set("user:1", &"Ada", Some(Duration::from_secs(5)))?;
    /// assert_eq!(store.get::<String>("user:1").as_deref(), Some("Ada"));
    /// # Ok::<(), tiercache::CacheError>(())
    /// ```
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Option<Duration>) -> CacheResult<()> {
        let ttl = ttl.unwrap_or(self.config.default_ttl);
        if ttl.is_zero() {
            return Err(CacheError::InvalidTtl { key: key.to_string() });
        }
        let data = self.codec.encode(value)?;
        self.insert_encoded(key.to_string(), data, ttl)
    }

    /// Store an already-encoded value.
    ///
    /// Overwriting an existing key keeps its creation time and access count
    /// (incremented) and refreshes expiry. Inserting a new key into a full
    /// tier evicts a batch of least-recently-used entries first.
    pub fn insert_encoded(&self, key: String, data: Vec<u8>, ttl: Duration) -> CacheResult<()> {
        if ttl.is_zero() {
            return Err(CacheError::InvalidTtl { key });
        }

        let evicted = {
            let mut entries = self.entries.write();
            let stamp = self.clock.stamp();

            if let Some(existing) = entries.get_mut(&key) {
                existing.overwrite(data, ttl, stamp);
                return Ok(());
            }

            let mut evicted = 0;
            if self.eviction.needs_eviction(entries.len()) {
                for victim in self.eviction.select_victims(&entries, &key) {
                    if entries.remove(&victim).is_some() {
                        evicted += 1;
                    }
                }
            }

            let entry = CacheEntry::new(key.clone(), data, ttl, stamp, self.tier);
            entries.insert(key, entry);
            evicted
        };

        if evicted > 0 {
            self.total_evictions.fetch_add(1, Ordering::Relaxed);
            self.total_evicted.fetch_add(evicted as u64, Ordering::Relaxed);
            debug!("Evicted {} LRU entries from {} tier", evicted, self.tier);
        }

        Ok(())
    }

    /// Whether a live (unexpired) entry exists. Does not count as an access.
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .read()
            .get(key)
            .map(|entry| !entry.is_expired())
            .unwrap_or(false)
    }

    pub fn remove(&self, key: &str) -> bool {
        self.entries.write().remove(key).is_some()
    }

    /// Remove every entry; returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.write();
        let removed = entries.len();
        entries.clear();
        removed
    }

    /// Remove every entry whose key matches `predicate`.
    pub fn remove_where<F>(&self, predicate: F) -> usize
    where
        F: Fn(&str) -> bool,
    {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|key, _| !predicate(key));
        before - entries.len()
    }

    /// Remove all entries past their expiry; returns the number removed.
    ///
    /// Expired keys are collected under the shared lock and removed under the
    /// exclusive lock, skipping any key overwritten in between.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<(String, u64)> = self
            .entries
            .read()
            .values()
            .filter(|entry| entry.is_expired_at(now))
            .map(|entry| (entry.key().to_string(), entry.revision()))
            .collect();

        if expired.is_empty() {
            return 0;
        }

        let removed = {
            let mut entries = self.entries.write();
            expired
                .into_iter()
                .filter(|(key, revision)| {
                    let still_expired = entries
                        .get(key)
                        .map(|entry| entry.revision() == *revision && entry.is_expired_at(now))
                        .unwrap_or(false);
                    still_expired && entries.remove(key).is_some()
                })
                .count()
        };

        self.expired_removed.fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    /// Run `f` against the entries under the shared lock.
    pub fn inspect<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&HashMap<String, CacheEntry>) -> R,
    {
        f(&self.entries.read())
    }

    pub fn stats(&self) -> TierStats {
        TierStats {
            tier: self.tier,
            entries: self.len(),
            capacity: self.config.capacity,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            total_evictions: self.total_evictions.load(Ordering::Relaxed),
            total_evicted: self.total_evicted.load(Ordering::Relaxed),
            expired_removed: self.expired_removed.load(Ordering::Relaxed),
            corrupt_removed: self.corrupt_removed.load(Ordering::Relaxed),
        }
    }

    /// Remove `key` only if it still holds the write identified by `revision`.
    ///
    /// Revisions are write stamps from this store's clock, so an entry that
    /// was removed and re-created under the same key is never matched.
    fn remove_revision(&self, key: &str, revision: u64) -> bool {
        let mut entries = self.entries.write();
        match entries.get(key) {
            Some(entry) if entry.revision() == revision => entries.remove(key).is_some(),
            _ => false,
        }
    }
}
