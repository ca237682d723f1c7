//! Frame Sampler Implementation

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

/// Shortest period a sampler accepts
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Periodic sampler.
///
/// `start` spawns a timer task on the current tokio runtime; each period it
/// spawns the tick future and immediately waits for the next period. Stopping
/// cancels the timer only: tick futures already spawned run to completion.
pub struct FrameSampler {
    /// Name used in logs
    name: String,
    /// Tick period
    interval: Duration,
    /// Timer task while running
    task: Mutex<Option<JoinHandle<()>>>,
    /// Ticks fired since creation
    ticks: Arc<AtomicU64>,
}

impl FrameSampler {
    /// Create a stopped sampler
    pub fn new(name: impl Into<String>, interval: Duration) -> Self {
        let name = name.into();
        let interval = if interval < MIN_INTERVAL {
            warn!("Sampler {} interval {:?} too short, using {:?}", name, interval, MIN_INTERVAL);
            MIN_INTERVAL
        } else {
            interval
        };

        Self {
            name,
            interval,
            task: Mutex::new(None),
            ticks: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Begin firing `on_tick` every period.
    ///
    /// The first tick fires one full period after the call. Returns `false`
    /// if the sampler was already running (the existing timer is kept).
    /// Must be called from within a tokio runtime.
    pub fn start<F, Fut>(&self, on_tick: F) -> bool
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut task = self.lock_task();
        if task.as_ref().is_some_and(|h| !h.is_finished()) {
            debug!("Sampler {} already running", self.name);
            return false;
        }

        let period = self.interval;
        let ticks = Arc::clone(&self.ticks);
        let name = self.name.clone();

        *task = Some(tokio::spawn(async move {
            let mut timer = time::interval_at(Instant::now() + period, period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                timer.tick().await;
                let n = ticks.fetch_add(1, Ordering::AcqRel) + 1;
                trace!("Sampler {} tick #{}", name, n);
                tokio::spawn(on_tick());
            }
        }));

        info!("Sampler {} started ({}ms period)", self.name, period.as_millis());
        true
    }

    /// Halt future ticks. Returns `false` if the sampler was not running.
    pub fn stop(&self) -> bool {
        match self.lock_task().take() {
            Some(handle) => {
                handle.abort();
                info!("Sampler {} stopped", self.name);
                true
            }
            None => false,
        }
    }

    /// Check if the timer is running
    pub fn is_running(&self) -> bool {
        self.lock_task().as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Total ticks fired
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }

    /// Tick period
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Sampler name
    pub fn name(&self) -> &str {
        &self.name
    }

    fn lock_task(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.task.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for FrameSampler {
    fn drop(&mut self) {
        if let Some(handle) = self.lock_task().take() {
            handle.abort();
        }
    }
}
