//! Shared primitive types: tier identifiers and clock helpers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::time::Instant;

/// Current wall-clock time in milliseconds since the UNIX epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Cache tier levels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    /// Short-lived in-memory tier, consulted first by `MemoryFirst`
    Fast,
    /// Longer-lived tier, consulted first by `PersistentFirst`
    Durable,
}

impl Tier {
    /// Both tiers, fast first.
    pub fn all() -> [Tier; 2] {
        [Tier::Fast, Tier::Durable]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Fast => "fast",
            Tier::Durable => "durable",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Monotonic access clock used to order entries for LRU eviction.
///
/// Stamps are nanoseconds elapsed since the clock was created, forced to be
/// strictly increasing so two accesses within the same clock tick still
/// have a well-defined order.
#[derive(Debug)]
pub struct AccessClock {
    origin: Instant,
    last: AtomicU64,
}

impl AccessClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            last: AtomicU64::new(0),
        }
    }

    /// Returns the next stamp, strictly greater than every earlier one.
    pub fn stamp(&self) -> u64 {
        let elapsed = self.origin.elapsed().as_nanos() as u64;
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let next = elapsed.max(prev + 1);
            match self
                .last
                .compare_exchange_weak(prev, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(current) => prev = current,
            }
        }
    }
}

impl Default for AccessClock {
    fn default() -> Self {
        Self::new()
    }
}
