//! Integration tests for cache-aside lookups across the two tiers.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tiercache::{CacheConfig, FallbackStrategy, Tier, TieredCache};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Customer {
    name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Discount {
    code: String,
    percent: u8,
}

fn cache() -> TieredCache {
    TieredCache::new(CacheConfig::default().with_sweep_enabled(false)).unwrap()
}

fn discount(code: &str) -> Discount {
    Discount {
        code: code.to_string(),
        percent: 10,
    }
}

// ============================================================================
// MEMORY FIRST
// ============================================================================

#[tokio::test]
async fn test_loader_runs_once_then_value_is_cached() {
    let cache = cache();
    let calls = AtomicUsize::new(0);
    let counter = &calls;

    for _ in 0..3 {
        let value: Option<Discount> = cache
            .get_or_load("discount:SPRING", FallbackStrategy::MemoryFirst, move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(Some(discount("SPRING")))
            })
            .await
            .unwrap();
        assert_eq!(value, Some(discount("SPRING")));
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(cache.contains(Tier::Fast, "discount:SPRING"));
    assert!(!cache.contains(Tier::Durable, "discount:SPRING"));
}

#[tokio::test]
async fn test_durable_hit_is_promoted_to_fast() {
    let cache = cache();
    cache
        .set_in(Tier::Durable, "discount:VIP", &discount("VIP"), None)
        .unwrap();

    let value: Option<Discount> = cache
        .get_or_load("discount:VIP", FallbackStrategy::MemoryFirst, || async {
            Err::<Option<Discount>, _>("loader must not run".to_string())
        })
        .await
        .unwrap();

    assert_eq!(value, Some(discount("VIP")));
    assert_eq!(cache.get::<Discount>("discount:VIP"), Some(discount("VIP")));
    assert!(cache.contains(Tier::Durable, "discount:VIP"));
}

#[tokio::test]
async fn test_absent_value_is_not_cached() {
    let cache = cache();
    let calls = AtomicUsize::new(0);
    let counter = &calls;

    for _ in 0..2 {
        let value: Option<Discount> = cache
            .get_or_load("discount:NONE", FallbackStrategy::MemoryFirst, move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(None)
            })
            .await
            .unwrap();
        assert_eq!(value, None);
    }

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(!cache.contains(Tier::Fast, "discount:NONE"));
}

#[tokio::test]
async fn test_loader_error_propagates_and_nothing_is_cached() {
    let cache = cache();

    let result: Result<Option<Discount>, String> = cache
        .get_or_load("discount:BROKEN", FallbackStrategy::MemoryFirst, || async {
            Err("database unavailable".to_string())
        })
        .await;

    assert_eq!(result, Err("database unavailable".to_string()));
    assert!(!cache.contains(Tier::Fast, "discount:BROKEN"));
    assert!(!cache.contains(Tier::Durable, "discount:BROKEN"));
}

// ============================================================================
// PERSISTENT FIRST AND SINGLE-TIER STRATEGIES
// ============================================================================

#[tokio::test]
async fn test_persistent_first_populates_durable_only() {
    let cache = cache();

    let value: Option<Discount> = cache
        .get_or_load("discount:P", FallbackStrategy::PersistentFirst, || async {
            Ok::<_, String>(Some(discount("P")))
        })
        .await
        .unwrap();

    assert_eq!(value, Some(discount("P")));
    assert!(cache.contains(Tier::Durable, "discount:P"));
    assert!(!cache.contains(Tier::Fast, "discount:P"));
}

#[tokio::test]
async fn test_persistent_first_falls_back_to_fast_without_promotion() {
    let cache = cache();
    cache.set("discount:F", &discount("F"), None).unwrap();

    let value: Option<Discount> = cache
        .get_or_load("discount:F", FallbackStrategy::PersistentFirst, || async {
            Ok::<_, String>(None)
        })
        .await
        .unwrap();

    assert_eq!(value, Some(discount("F")));
    assert!(!cache.contains(Tier::Durable, "discount:F"));
}

#[tokio::test]
async fn test_memory_only_ignores_durable() {
    let cache = cache();
    cache
        .set_in(Tier::Durable, "discount:D", &discount("durable"), None)
        .unwrap();

    let value: Option<Discount> = cache
        .get_or_load("discount:D", FallbackStrategy::MemoryOnly, || async {
            Ok::<_, String>(Some(discount("loaded")))
        })
        .await
        .unwrap();

    assert_eq!(value, Some(discount("loaded")));
    assert_eq!(cache.get::<Discount>("discount:D"), Some(discount("loaded")));
    assert_eq!(
        cache.get_from::<Discount>(Tier::Durable, "discount:D"),
        Some(discount("durable"))
    );
}

#[tokio::test]
async fn test_persistent_only_ignores_fast() {
    let cache = cache();
    cache.set("discount:X", &discount("fast"), None).unwrap();

    let value: Option<Discount> = cache
        .get_or_load("discount:X", FallbackStrategy::PersistentOnly, || async {
            Ok::<_, String>(Some(discount("loaded")))
        })
        .await
        .unwrap();

    assert_eq!(value, Some(discount("loaded")));
    assert_eq!(
        cache.get_from::<Discount>(Tier::Durable, "discount:X"),
        Some(discount("loaded"))
    );
    assert_eq!(cache.get::<Discount>("discount:X"), Some(discount("fast")));
}

// ============================================================================
// EXPIRY AND INVALIDATION
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_customer_expires_after_ttl() {
    let cache = cache();
    let customer = Customer { name: "A".into() };
    cache
        .set("user:1", &customer, Some(Duration::from_secs(5)))
        .unwrap();

    tokio::time::advance(Duration::from_secs(4)).await;
    assert_eq!(cache.get::<Customer>("user:1"), Some(customer));

    tokio::time::advance(Duration::from_secs(2)).await;
    assert_eq!(cache.get::<Customer>("user:1"), None);
}

#[tokio::test(start_paused = true)]
async fn test_expired_fast_entry_reloads() {
    let cache = cache();
    let calls = AtomicUsize::new(0);
    let counter = &calls;

    let load = move || async move {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok::<_, String>(Some(discount("TTL")))
    };

    cache
        .get_or_load::<Discount, _, _, _>("discount:TTL", FallbackStrategy::MemoryOnly, load)
        .await
        .unwrap();
    tokio::time::advance(cache.config().fast.default_ttl + Duration::from_secs(1)).await;
    cache
        .get_or_load::<Discount, _, _, _>("discount:TTL", FallbackStrategy::MemoryOnly, load)
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_invalidate_by_substring_spans_tiers() {
    let cache = cache();
    cache.set("user:1", &1u32, None).unwrap();
    cache.set("user:2", &2u32, None).unwrap();
    cache.set("order:1", &3u32, None).unwrap();
    cache.set_in(Tier::Durable, "user:3", &4u32, None).unwrap();

    assert_eq!(cache.invalidate("user:"), 3);
    assert!(!cache.contains(Tier::Fast, "user:1"));
    assert!(!cache.contains(Tier::Fast, "user:2"));
    assert!(!cache.contains(Tier::Durable, "user:3"));
    assert_eq!(cache.get::<u32>("order:1"), Some(3));
}

#[test]
fn test_invalidate_matching_regex() {
    let cache = cache();
    cache.set("tax:region:1", &1u32, None).unwrap();
    cache.set("tax:default", &2u32, None).unwrap();
    cache.set_in(Tier::Durable, "tax:region:2", &3u32, None).unwrap();

    let pattern = regex::Regex::new(r"^tax:region:\d+$").unwrap();
    assert_eq!(cache.invalidate_matching(&pattern), 2);
    assert!(cache.contains(Tier::Fast, "tax:default"));
}

#[test]
fn test_remove_and_clear_span_tiers() {
    let cache = cache();
    cache.set("k", &1u8, None).unwrap();
    cache.set_in(Tier::Durable, "k", &1u8, None).unwrap();
    cache.set_in(Tier::Durable, "other", &1u8, None).unwrap();

    assert!(cache.remove("k"));
    assert!(!cache.contains(Tier::Fast, "k"));
    assert!(!cache.contains(Tier::Durable, "k"));
    assert!(!cache.remove("k"));

    cache.clear();
    assert!(cache.store(Tier::Durable).is_empty());
}

// ============================================================================
// CONCURRENCY
// ============================================================================

#[tokio::test]
async fn test_concurrent_misses_are_not_coalesced() {
    let cache = cache();
    let calls = AtomicUsize::new(0);
    let counter = &calls;

    let load = move || async move {
        counter.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        Ok::<_, String>(Some(discount("RACE")))
    };

    let (a, b) = tokio::join!(
        cache.get_or_load::<Discount, _, _, _>("discount:RACE", FallbackStrategy::MemoryFirst, load),
        cache.get_or_load::<Discount, _, _, _>("discount:RACE", FallbackStrategy::MemoryFirst, load),
    );

    assert_eq!(a.unwrap(), Some(discount("RACE")));
    assert_eq!(b.unwrap(), Some(discount("RACE")));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(cache.store(Tier::Fast).len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_shared_cache_across_tasks() {
    let cache = cache();
    let mut handles = Vec::new();

    for task_id in 0..8 {
        let cache = cache.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..25 {
                let key = format!("sale:{}:{}", task_id, i);
                let value: Option<u64> = cache
                    .get_or_load(&key, FallbackStrategy::MemoryFirst, move || async move {
                        Ok::<_, String>(Some(i as u64))
                    })
                    .await
                    .unwrap();
                assert_eq!(value, Some(i as u64));
            }
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(cache.store(Tier::Fast).len(), 200);
}
