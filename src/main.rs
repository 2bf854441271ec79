//! # Cache Server Entry Point
//!
//! Composition root for the point-of-sale cache: builds the cache service
//! from environment configuration, warms the retail settings every sale
//! needs, and reports statistics until interrupted.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tiercache::{CacheConfig, CacheService, FallbackStrategy, Tier, WarmupItem};
use tracing_subscriber::EnvFilter;

/// Tax configuration as loaded by the configuration service.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TaxRule {
    region: String,
    rate_bps: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("=================================================");
    println!("  Point-of-Sale Tiered Cache                     ");
    println!("=================================================");
    println!();

    let config = match CacheConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("✗ Invalid cache configuration: {}", e);
            return Err(e.into());
        }
    };
    println!("Configuration:");
    println!(
        "  - Fast tier:    {} entries, {}s ttl",
        config.fast.capacity,
        config.fast.default_ttl.as_secs()
    );
    println!(
        "  - Durable tier: {} entries, {}s ttl",
        config.durable.capacity,
        config.durable.default_ttl.as_secs()
    );
    println!(
        "  - Sweep:        every {}s (enabled: {})",
        config.sweep.interval.as_secs(),
        config.sweep.enabled
    );
    println!("  - Codec:        {}", config.codec);
    println!();

    let report_interval = match tiercache::config::interval_var(
        &|name: &str| std::env::var(name).ok(),
        "TIER_CACHE_REPORT_INTERVAL_SECS",
    ) {
        Ok(interval) => interval.unwrap_or(Duration::from_secs(30)),
        Err(e) => {
            eprintln!("✗ Invalid report interval: {}", e);
            return Err(e.into());
        }
    };

    let service = CacheService::start(config)?;
    println!("✓ Cache service started");

    let report = service
        .warmup(vec![
            WarmupItem::new("config:store:currency", Tier::Durable, None, || async {
                Ok::<_, String>(Some("USD".to_string()))
            }),
            WarmupItem::new("config:tax:default", Tier::Durable, None, || async {
                Ok::<_, String>(Some(TaxRule {
                    region: "default".to_string(),
                    rate_bps: 825,
                }))
            }),
            WarmupItem::new("config:receipt:footer", Tier::Fast, None, || async {
                Ok::<_, String>(Some("Thank you for shopping with us".to_string()))
            }),
        ])
        .await;
    println!(
        "✓ Warmup: {} loaded, {} empty, {} failed",
        report.loaded.len(),
        report.empty.len(),
        report.failed.len()
    );

    // Exercise the MemoryFirst path once so the durable entry is promoted
    let tax: Option<TaxRule> = service
        .get_or_load("config:tax:default", FallbackStrategy::MemoryFirst, || async {
            Ok::<_, String>(None)
        })
        .await?;
    if let Some(rule) = tax {
        println!("  - Default tax rule: {} @ {} bps", rule.region, rule.rate_bps);
    }
    println!();

    println!("Reporting statistics every {}s (Ctrl-C to stop)", report_interval.as_secs());
    let mut ticker = tokio::time::interval(report_interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let snapshot = service.statistics();
                log::info!("Cache statistics: {}", serde_json::to_string(&snapshot)?);
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    service.shutdown();

    println!("=================================================");
    println!("  Cache Server Shut Down");
    println!("=================================================");

    Ok(())
}
