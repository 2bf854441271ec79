//! Expiration sweeping - removing expired entries independent of reads.
//!
//! Provides two mechanisms:
//! 1. **On-demand sweep** (SweepService): one pass over both tiers
//! 2. **Scheduled sweep** (SweepScheduler): periodic background task (60-second default)

pub mod scheduler;
pub mod service;

pub use scheduler::{SweepScheduler, SweeperHandle};
pub use service::{SweepService, SweepStats};
