//! Fixed-interval poller
//!
//! Fires a callback immediately when enabled and then once per interval.
//! The callback lives in a mutable slot that is read on every tick, so the
//! most recently installed callback is always the one invoked.
//!
//! Each invocation's future is spawned and not awaited: a slow callback does
//! not delay the next tick, and invocations may overlap.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

pub type PollCallback = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Wrap an async closure as a [`PollCallback`]
pub fn poll_callback<F, Fut>(f: F) -> PollCallback
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move || f().boxed())
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PollerError {
    #[error("Polling interval must be positive")]
    ZeroInterval,
}

struct Slot {
    callback: PollCallback,
    interval: Duration,
    enabled: bool,
    /// Bumped on every (re)start and stop; a timer task only fires while
    /// its generation is current.
    generation: u64,
    task: Option<JoinHandle<()>>,
}

/// Timer-driven repeating trigger.
///
/// Must be enabled from within a tokio runtime. The callback itself runs
/// while the poller's slot is locked and must not call back into the poller
/// synchronously (its returned future may).
pub struct Poller {
    slot: Arc<Mutex<Slot>>,
}

impl Poller {
    /// Create a disabled poller
    pub fn new(interval: Duration, callback: PollCallback) -> Result<Self, PollerError> {
        if interval.is_zero() {
            return Err(PollerError::ZeroInterval);
        }
        Ok(Self {
            slot: Arc::new(Mutex::new(Slot {
                callback,
                interval,
                enabled: false,
                generation: 0,
                task: None,
            })),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.slot.lock().unwrap().enabled
    }

    pub fn interval(&self) -> Duration {
        self.slot.lock().unwrap().interval
    }

    /// Install a new callback; takes effect from the next tick.
    pub fn set_callback(&self, callback: PollCallback) {
        self.slot.lock().unwrap().callback = callback;
    }

    /// Start or stop polling.
    ///
    /// Enabling fires the callback right away. Once disabling returns, no
    /// further invocation starts; futures already spawned keep running.
    pub fn set_enabled(&self, enabled: bool) {
        let mut slot = self.slot.lock().unwrap();
        if slot.enabled == enabled {
            return;
        }
        slot.enabled = enabled;
        if enabled {
            Self::start(&self.slot, &mut slot);
            debug!(interval_ms = slot.interval.as_millis() as u64, "Poller enabled");
        } else {
            Self::stop(&mut slot);
            debug!("Poller disabled");
        }
    }

    /// Change the interval. A running poller restarts its schedule,
    /// including the immediate first invocation.
    pub fn set_interval(&self, interval: Duration) -> Result<(), PollerError> {
        if interval.is_zero() {
            return Err(PollerError::ZeroInterval);
        }
        let mut slot = self.slot.lock().unwrap();
        if slot.interval == interval {
            return Ok(());
        }
        slot.interval = interval;
        if slot.enabled {
            Self::stop(&mut slot);
            Self::start(&self.slot, &mut slot);
        }
        Ok(())
    }

    fn start(shared: &Arc<Mutex<Slot>>, slot: &mut Slot) {
        slot.generation += 1;
        let generation = slot.generation;
        let period = slot.interval;
        let shared = Arc::clone(shared);
        slot.task = Some(tokio::spawn(run_ticks(shared, generation, period)));
    }

    fn stop(slot: &mut Slot) {
        slot.generation += 1;
        if let Some(task) = slot.task.take() {
            task.abort();
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.slot.lock() {
            slot.enabled = false;
            Self::stop(&mut slot);
        }
    }
}

async fn run_ticks(shared: Arc<Mutex<Slot>>, generation: u64, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        {
            let slot = shared.lock().unwrap();
            if !slot.enabled || slot.generation != generation {
                break;
            }
            // Spawn under the lock so a concurrent stop cannot slip in between.
            tokio::spawn((slot.callback)());
        }
    }
}
