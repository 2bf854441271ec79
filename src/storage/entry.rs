//! Cache entry and its access bookkeeping.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;

use crate::types::Tier;

/// Longest lifetime an entry can be given; larger TTLs are clamped to it.
pub const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Expiry deadline `ttl` after `now`, clamped so it never overflows.
fn deadline(now: Instant, ttl: Duration) -> Instant {
    now.checked_add(ttl)
        .or_else(|| now.checked_add(MAX_TTL))
        .unwrap_or(now)
}

/// An encoded value cached with metadata for expiration and LRU tracking.
///
/// Access bookkeeping (`last_accessed`, `access_count`) is atomic so reads
/// can update it while holding only a shared lock on the store.
#[derive(Debug)]
pub struct CacheEntry {
    key: String,

    /// Encoded value
    data: Vec<u8>,

    created_at: Instant,

    expires_at: Instant,

    /// Access stamp at creation, used to break LRU ties
    created_stamp: u64,

    /// Access stamp of the last read or overwrite
    last_accessed: AtomicU64,

    /// Successful reads plus overwrites; never decremented
    access_count: AtomicU64,

    /// Stamp of the last write; unique among entries of one store, so a
    /// re-created key never shares a revision with its predecessor
    revision: u64,

    tier: Tier,
}

impl CacheEntry {
    /// Create a new entry expiring `ttl` from now.
    pub fn new(key: String, data: Vec<u8>, ttl: Duration, stamp: u64, tier: Tier) -> Self {
        let now = Instant::now();
        Self {
            key,
            data,
            created_at: now,
            expires_at: deadline(now, ttl),
            created_stamp: stamp,
            last_accessed: AtomicU64::new(stamp),
            access_count: AtomicU64::new(0),
            revision: stamp,
            tier,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    pub fn created_stamp(&self) -> u64 {
        self.created_stamp
    }

    #[inline]
    pub fn last_accessed(&self) -> u64 {
        self.last_accessed.load(Ordering::Acquire)
    }

    #[inline]
    pub fn access_count(&self) -> u64 {
        self.access_count.load(Ordering::Acquire)
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    /// An entry is expired once the current time is strictly past `expires_at`.
    #[inline]
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now > self.expires_at
    }

    #[inline]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Record a successful read.
    #[inline]
    pub fn mark_accessed(&self, stamp: u64) {
        self.last_accessed.fetch_max(stamp, Ordering::AcqRel);
        self.access_count.fetch_add(1, Ordering::AcqRel);
    }

    /// Replace the value in place, keeping `created_at` and the access count.
    pub fn overwrite(&mut self, data: Vec<u8>, ttl: Duration, stamp: u64) {
        self.data = data;
        self.expires_at = deadline(Instant::now(), ttl);
        self.revision = stamp;
        self.mark_accessed(stamp);
    }

    /// Approximate footprint: key bytes plus encoded data bytes.
    pub fn payload_size(&self) -> usize {
        self.key.len() + self.data.len()
    }
}
