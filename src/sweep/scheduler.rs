//! Scheduled expiration sweep - background task removing expired entries.
//!
//! Reads already reject expired entries, so the sweeper only bounds how long
//! an expired entry keeps occupying memory (and capacity) when nobody reads
//! it again.
//!
//! # Lifecycle
//!
//! `SweepScheduler::spawn` starts the schedule on the current tokio runtime
//! and returns a `SweeperHandle`. Stopping the handle (explicitly, or by
//! dropping it) cancels the schedule: no tick starts after `stop` returns,
//! and no entries are removed as part of stopping.

use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::service::{SweepService, SweepStats};
use crate::config::{SweepConfig, MAX_INTERVAL};
use crate::error::{CacheError, CacheResult};
use crate::types::now_ms;
use log::{debug, error, info};

/// Scheduler for periodic expiration sweeps.
pub struct SweepScheduler {
    service: SweepService,
    config: SweepConfig,
    /// Timestamp of the last completed sweep (ms since epoch), 0 if none yet
    last_sweep_at: RwLock<u64>,
    /// Entries removed across all completed sweeps
    total_swept: AtomicU64,
    /// Number of ticks that failed
    failed_sweeps: AtomicU64,
    stopped: AtomicBool,
    #[cfg(test)]
    injected_failures: AtomicU64,
}

impl SweepScheduler {
    pub fn new(service: SweepService, config: SweepConfig) -> Self {
        Self {
            service,
            config,
            last_sweep_at: RwLock::new(0),
            total_swept: AtomicU64::new(0),
            failed_sweeps: AtomicU64::new(0),
            stopped: AtomicBool::new(false),
            #[cfg(test)]
            injected_failures: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Timestamp of the last completed sweep in ms since the UNIX epoch.
    pub fn last_sweep(&self) -> u64 {
        *self.last_sweep_at.read()
    }

    pub fn total_swept(&self) -> u64 {
        self.total_swept.load(Ordering::Relaxed)
    }

    pub fn failed_sweeps(&self) -> u64 {
        self.failed_sweeps.load(Ordering::Relaxed)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Spawns the sweep loop on the current tokio runtime.
    ///
    /// # Returns
    /// A `SweeperHandle` owning the background task. If the sweeper is
    /// disabled in config, the handle owns no task. Fails with
    /// `InvalidConfig` if the interval is zero or above `MAX_INTERVAL`, and
    /// with `Runtime` when called outside a tokio runtime.
    ///
    /// # Example
    /// ```rust,no_run
    /// use std::sync::Arc;
    /// use tiercache::{SweepConfig, SweepScheduler, TieredCache};
    ///
    /// # async fn start() -> Result<(), tiercache::CacheError> {
    /// let cache = TieredCache::with_defaults();
    /// let scheduler = Arc::new(SweepScheduler::new(cache.sweep_service(), SweepConfig::default()));
    /// let handle = scheduler.spawn()?;
    ///
    /// // ... serve requests ...
    ///
    /// handle.stop();
    /// # Ok(())
    /// # }
    /// ```
    pub fn spawn(self: Arc<Self>) -> CacheResult<SweeperHandle> {
        if !self.config.enabled {
            info!("Expiration sweeper is disabled, skipping");
            return Ok(SweeperHandle {
                scheduler: self,
                task: Mutex::new(None),
            });
        }

        if self.config.interval.is_zero() || self.config.interval > MAX_INTERVAL {
            return Err(CacheError::InvalidConfig(format!(
                "sweep interval must be between 1s and {}s",
                MAX_INTERVAL.as_secs()
            )));
        }

        let runtime = Handle::try_current().map_err(|e| CacheError::Runtime(e.to_string()))?;
        let task = runtime.spawn(Arc::clone(&self).run());

        Ok(SweeperHandle {
            scheduler: self,
            task: Mutex::new(Some(task)),
        })
    }

    /// The sweep loop. Runs until stopped; the first tick fires one interval
    /// after start.
    pub async fn run(self: Arc<Self>) {
        let period = self.config.interval;
        info!(
            "Starting expiration sweeper with {}-second interval",
            period.as_secs_f64()
        );

        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if self.is_stopped() {
                break;
            }
            self.do_sweep();
        }
    }

    /// Executes one sweep tick.
    ///
    /// A failing pass is logged and counted; it never ends the schedule.
    pub fn do_sweep(&self) -> Option<SweepStats> {
        match panic::catch_unwind(AssertUnwindSafe(|| {
            #[cfg(test)]
            self.maybe_fail();
            self.service.sweep_now()
        })) {
            Ok(stats) => {
                let removed = stats.total_removed();
                if removed > 0 {
                    info!(
                        "Expiration sweep removed {} entries (fast: {}, durable: {}) in {}ms",
                        removed, stats.removed_fast, stats.removed_durable, stats.duration_ms
                    );
                } else {
                    debug!("Expiration sweep found no expired entries");
                }
                self.total_swept.fetch_add(removed as u64, Ordering::Relaxed);
                *self.last_sweep_at.write() = stats.timestamp;
                Some(stats)
            }
            Err(payload) => {
                self.failed_sweeps.fetch_add(1, Ordering::Relaxed);
                error!("Expiration sweep failed: {}", panic_message(payload.as_ref()));
                None
            }
        }
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    /// Make the next `count` passes panic before touching the tiers.
    #[cfg(test)]
    fn fail_next_sweeps(&self, count: u64) {
        self.injected_failures.store(count, Ordering::Relaxed);
    }

    #[cfg(test)]
    fn maybe_fail(&self) {
        let pending = self
            .injected_failures
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
        if pending.is_ok() {
            panic!("injected sweep failure");
        }
    }
}

/// Scoped ownership of a running sweeper. Dropping it stops the sweeper.
pub struct SweeperHandle {
    scheduler: Arc<SweepScheduler>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SweeperHandle {
    pub fn scheduler(&self) -> &Arc<SweepScheduler> {
        &self.scheduler
    }

    /// Whether the background task is still scheduled.
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .map(|task| !task.is_finished())
            .unwrap_or(false)
    }

    /// Cancel the schedule. Idempotent.
    pub fn stop(&self) {
        self.scheduler.stop();
        if let Some(task) = self.task.lock().take() {
            task.abort();
            info!("Expiration sweeper stopped");
        }
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for SweeperHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SweeperHandle")
            .field("running", &self.is_running())
            .field("total_swept", &self.scheduler.total_swept())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
