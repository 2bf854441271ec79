//! Startup cache warming.
//!
//! A warmup batch runs every loader concurrently on the tokio runtime and
//! writes each non-empty result into the tier named by its item. A failing
//! or panicking loader is logged and skipped; the rest of the batch still
//! completes.

use log::{info, warn};
use serde::Serialize;
use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use crate::storage::{EntryCodec, TierStore};
use crate::types::Tier;

type LoadFuture = Pin<Box<dyn Future<Output = Result<Option<Vec<u8>>, String>> + Send>>;
type BoxedLoader = Box<dyn FnOnce(EntryCodec) -> LoadFuture + Send>;

/// One key to pre-populate: where it goes, for how long, and how to load it.
pub struct WarmupItem {
    key: String,
    tier: Tier,
    ttl: Option<Duration>,
    loader: BoxedLoader,
}

impl WarmupItem {
    /// Create a warmup item.
    ///
    /// `ttl` of `None` uses the target tier's default TTL. The loader's value
    /// is encoded with the cache's codec once it resolves.
    pub fn new<T, E, F, Fut>(key: impl Into<String>, tier: Tier, ttl: Option<Duration>, loader: F) -> Self
    where
        T: Serialize + Send + 'static,
        E: Display + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Option<T>, E>> + Send + 'static,
    {
        let loader: BoxedLoader = Box::new(move |codec: EntryCodec| -> LoadFuture {
            Box::pin(async move {
                match loader().await {
                    Ok(Some(value)) => codec.encode(&value).map(Some).map_err(|e| e.to_string()),
                    Ok(None) => Ok(None),
                    Err(e) => Err(e.to_string()),
                }
            })
        });

        Self {
            key: key.into(),
            tier,
            ttl,
            loader,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }
}

impl std::fmt::Debug for WarmupItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WarmupItem")
            .field("key", &self.key)
            .field("tier", &self.tier)
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Outcome of a warmup batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WarmupReport {
    /// Keys written into their tier
    pub loaded: Vec<String>,
    /// Keys whose loader returned nothing
    pub empty: Vec<String>,
    /// Keys whose loader (or write) failed, with the reason
    pub failed: Vec<(String, String)>,
}

impl WarmupReport {
    pub fn total(&self) -> usize {
        self.loaded.len() + self.empty.len() + self.failed.len()
    }
}

/// Fans a batch of loaders out and populates the tiers with their results.
#[derive(Debug, Clone)]
pub struct WarmupCoordinator {
    fast: Arc<TierStore>,
    durable: Arc<TierStore>,
}

impl WarmupCoordinator {
    pub fn new(fast: Arc<TierStore>, durable: Arc<TierStore>) -> Self {
        Self { fast, durable }
    }

    fn store(&self, tier: Tier) -> &TierStore {
        match tier {
            Tier::Fast => &self.fast,
            Tier::Durable => &self.durable,
        }
    }

    /// Run every loader concurrently and wait for all of them to settle.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn warmup(&self, items: Vec<WarmupItem>) -> WarmupReport {
        let codec = self.fast.codec();
        let mut report = WarmupReport::default();

        let tasks: Vec<_> = items
            .into_iter()
            .map(|item| {
                let task = tokio::spawn((item.loader)(codec));
                (item.key, item.tier, item.ttl, task)
            })
            .collect();

        for (key, tier, ttl, task) in tasks {
            let outcome = match task.await {
                Ok(result) => result,
                Err(join_error) => Err(format!("loader task failed: {}", join_error)),
            };

            match outcome {
                Ok(Some(data)) => {
                    let store = self.store(tier);
                    let ttl = ttl.unwrap_or_else(|| store.default_ttl());
                    match store.insert_encoded(key.clone(), data, ttl) {
                        Ok(()) => report.loaded.push(key),
                        Err(e) => {
                            warn!("Warmup of '{}' into {} tier failed: {}", key, tier, e);
                            report.failed.push((key, e.to_string()));
                        }
                    }
                }
                Ok(None) => report.empty.push(key),
                Err(reason) => {
                    warn!("Warmup loader for '{}' failed: {}", key, reason);
                    report.failed.push((key, reason));
                }
            }
        }

        info!(
            "Cache warmup finished: {} loaded, {} empty, {} failed",
            report.loaded.len(),
            report.empty.len(),
            report.failed.len()
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinator() -> (Arc<TierStore>, Arc<TierStore>, WarmupCoordinator) {
        let fast = Arc::new(TierStore::with_capacity(Tier::Fast, 10));
        let durable = Arc::new(TierStore::with_capacity(Tier::Durable, 10));
        let coordinator = WarmupCoordinator::new(fast.clone(), durable.clone());
        (fast, durable, coordinator)
    }

    #[tokio::test]
    async fn test_populates_requested_tiers() {
        let (fast, durable, coordinator) = coordinator();
        let items = vec![
            WarmupItem::new("config:currency", Tier::Fast, None, || async {
                Ok::<_, String>(Some("USD".to_string()))
            }),
            WarmupItem::new("config:tax_bps", Tier::Durable, Some(Duration::from_secs(30)), || async {
                Ok::<_, String>(Some(825u32))
            }),
        ];

        let report = coordinator.warmup(items).await;

        assert_eq!(report.loaded.len(), 2);
        assert_eq!(fast.get::<String>("config:currency").as_deref(), Some("USD"));
        assert_eq!(durable.get::<u32>("config:tax_bps"), Some(825));
        assert!(!fast.contains("config:tax_bps"));
    }

    #[tokio::test]
    async fn test_empty_result_is_not_cached() {
        let (fast, _, coordinator) = coordinator();
        let items = vec![WarmupItem::new("missing", Tier::Fast, None, || async {
            Ok::<Option<u8>, String>(None)
        })];

        let report = coordinator.warmup(items).await;

        assert_eq!(report.empty, vec!["missing".to_string()]);
        assert!(fast.is_empty());
    }

    #[tokio::test]
    async fn test_panicking_loader_is_reported() {
        let (fast, _, coordinator) = coordinator();
        let items = vec![
            WarmupItem::new("boom", Tier::Fast, None, || async {
                if true {
                    panic!("loader exploded");
                }
                Ok::<Option<u8>, String>(None)
            }),
            WarmupItem::new("ok", Tier::Fast, None, || async { Ok::<_, String>(Some(1u8)) }),
        ];

        let report = coordinator.warmup(items).await;

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "boom");
        assert_eq!(report.loaded, vec!["ok".to_string()]);
        assert!(fast.contains("ok"));
    }

    #[tokio::test]
    async fn test_zero_ttl_item_fails_alone() {
        let (fast, _, coordinator) = coordinator();
        let items = vec![
            WarmupItem::new("zero", Tier::Fast, Some(Duration::ZERO), || async {
                Ok::<_, String>(Some(1u8))
            }),
            WarmupItem::new("fine", Tier::Fast, None, || async { Ok::<_, String>(Some(2u8)) }),
        ];

        let report = coordinator.warmup(items).await;

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.loaded, vec!["fine".to_string()]);
        assert!(!fast.contains("zero"));
    }
}
