//! View Poller
//!
//! Periodic refresh for a mounted view. The first cycle runs immediately on
//! start, later cycles follow at a fixed period. Stopping (or dropping) the
//! poller aborts its task, so nothing is fetched after the view unmounts.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Fixed-interval refresh loop owned by a view
pub struct Poller {
    name: &'static str,
    running: Arc<AtomicBool>,
    task_handle: StdMutex<Option<JoinHandle<()>>>,
}

impl Poller {
    /// Spawn the loop. `cycle` runs once right away, then every `period`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<F, Fut>(name: &'static str, period: Duration, cycle: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();

        let handle = tokio::spawn(async move {
            Self::poll_loop(name, period, running_clone, cycle).await;
        });

        log::debug!("Poller '{}' started (interval: {}s)", name, period.as_secs());

        Self {
            name,
            running,
            task_handle: StdMutex::new(Some(handle)),
        }
    }

    /// Abort the loop. Idempotent.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);

        let handle = self
            .task_handle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            handle.abort();
            log::debug!("Poller '{}' stopped", self.name);
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    async fn poll_loop<F, Fut>(
        name: &'static str,
        period: Duration,
        running: Arc<AtomicBool>,
        cycle: F,
    ) where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            if !running.load(Ordering::Relaxed) {
                break;
            }

            log::debug!("Poller '{}' refreshing", name);
            cycle().await;
        }

        log::debug!("Poller '{}' loop exited", name);
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}

// ============================================================================
// Tests
// ============================================================================
