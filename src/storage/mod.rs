//! Tier storage for cached entries.
//!
//! Two independent in-memory tiers share this implementation:
//! - **Fast**: small, short TTL, consulted first by `MemoryFirst`
//! - **Durable**: larger, longer TTL, consulted first by `PersistentFirst`
//!
//! Each tier is bounded by LRU eviction and carries its own expiry; entries
//! are never shared between tiers.

pub mod codec;
pub mod entry;
pub mod eviction;
pub mod store;
pub mod types;

pub use codec::EntryCodec;
pub use entry::{CacheEntry, MAX_TTL};
pub use eviction::{LruEviction, EVICTION_FRACTION};
pub use store::TierStore;
pub use types::TierStats;
