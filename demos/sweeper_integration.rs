//! Example: running the expiration sweeper next to a cache.
//!
//! Starts a `CacheService` with a 1-second sweep interval, stores a few
//! short-lived session tokens, and watches the sweeper reclaim them without
//! any reads.
//!
//! Run with: `cargo run --example sweeper_integration`

use std::time::Duration;
use tiercache::{CacheConfig, CacheService, Tier};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=================================================");
    println!("  Expiration Sweeper Integration Example         ");
    println!("=================================================");
    println!();

    let config = CacheConfig::default().with_sweep_interval(Duration::from_secs(1));
    let service = CacheService::start(config)?;
    println!("1. Cache service started with a 1-second sweep interval");

    for terminal in 1..=3 {
        service.set(
            &format!("session:terminal:{}", terminal),
            &format!("token-{}", terminal),
            Some(Duration::from_millis(500)),
        )?;
    }
    service.set_in(Tier::Durable, "config:store:currency", &"USD", None)?;
    println!(
        "2. Stored 3 session tokens (500ms ttl) and 1 store setting; fast tier holds {}",
        service.store(Tier::Fast).len()
    );

    tokio::time::sleep(Duration::from_millis(2500)).await;

    let scheduler = service.sweeper().scheduler();
    println!("3. After 2.5s:");
    println!("   - fast tier entries:    {}", service.store(Tier::Fast).len());
    println!("   - durable tier entries: {}", service.store(Tier::Durable).len());
    println!("   - entries swept:        {}", scheduler.total_swept());
    println!("   - last sweep (ms):      {}", scheduler.last_sweep());
    println!();

    service.shutdown();
    println!("4. Sweeper stopped (running: {})", service.sweeper().is_running());

    Ok(())
}
