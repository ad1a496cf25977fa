//! Fixed-period tick scheduler
//!
//! Drives a [`TickJob`] on a tokio interval with
//! `MissedTickBehavior::Skip`: if a tick overruns its period, the firings it
//! covered are dropped rather than queued, so ticks never overlap or burst.
//!
//! ```text
//!  start() ──► spawn loop ──► interval.tick() ──► job.run_tick() ──┐
//!                 ▲               │ period watch                   │
//!                 │               │ stop watch                     │
//!                 └───────────────┴────────────────────────────────┘
//! ```
//!
//! A period change keeps the firing that is already scheduled and spaces
//! every later firing by the new period. `stop()` lets an in-flight tick
//! finish; no further tick starts afterwards.

use crate::config::validate_tick_period;
use crate::core::EngineError;
use crate::monitoring::EngineMetrics;
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

/// Work executed once per tick
pub trait TickJob: Send + Sync + 'static {
    fn run_tick(&self);
}

impl<F> TickJob for F
where
    F: Fn() + Send + Sync + 'static,
{
    fn run_tick(&self) {
        self()
    }
}

struct RunningLoop {
    stop_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

pub struct Scheduler {
    period_tx: watch::Sender<Duration>,
    running: Mutex<Option<RunningLoop>>,
    metrics: EngineMetrics,
}

impl Scheduler {
    pub fn new(period_ms: u64, metrics: EngineMetrics) -> Result<Self, EngineError> {
        validate_tick_period(period_ms)?;
        let (period_tx, _) = watch::channel(Duration::from_millis(period_ms));
        Ok(Self {
            period_tx,
            running: Mutex::new(None),
            metrics,
        })
    }

    /// Start ticking `job` at the current period
    ///
    /// Returns `Ok(false)` if already running (no second loop is started).
    pub fn start(&self, job: Arc<dyn TickJob>) -> Result<bool, EngineError> {
        self.launch(job, None)
    }

    /// Start ticking `job` every `period_ms`
    ///
    /// The period is validated before anything changes. If the loop is
    /// already running this is a no-op and the period is left as is.
    pub fn start_with_period(
        &self,
        job: Arc<dyn TickJob>,
        period_ms: u64,
    ) -> Result<bool, EngineError> {
        validate_tick_period(period_ms)?;
        self.launch(job, Some(Duration::from_millis(period_ms)))
    }

    fn launch(&self, job: Arc<dyn TickJob>, period: Option<Duration>) -> Result<bool, EngineError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| EngineError::NoRuntime)?;

        let mut running = self.running.lock();
        if let Some(current) = running.as_ref() {
            if !current.join.is_finished() {
                debug!("Scheduler already running, start ignored");
                return Ok(false);
            }
        }

        if let Some(period) = period {
            self.period_tx.send_replace(period);
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let period_rx = self.period_tx.subscribe();
        let metrics = self.metrics.clone();

        let join = runtime.spawn(run_loop(job, period_rx, stop_rx, metrics));
        *running = Some(RunningLoop { stop_tx, join });

        info!(period_ms = self.period().as_millis() as u64, "Scheduler started");
        Ok(true)
    }

    /// Stop ticking; idempotent
    ///
    /// Returns true if a running loop was signalled.
    pub fn stop(&self) -> bool {
        let Some(current) = self.running.lock().take() else {
            return false;
        };
        // Receiver may already be gone if the loop exited on its own
        let _ = current.stop_tx.send(true);
        info!("Scheduler stopped");
        true
    }

    /// Stop and wait for the loop task to exit
    pub async fn shutdown(&self) {
        let current = self.running.lock().take();
        if let Some(current) = current {
            let _ = current.stop_tx.send(true);
            if let Err(e) = current.join.await {
                error!("Scheduler task ended abnormally: {}", e);
            }
            info!("Scheduler shut down");
        }
    }

    /// Change the tick period; takes effect from the next scheduled tick
    ///
    /// Out-of-range periods are rejected and leave the current period as is.
    pub fn set_period(&self, period_ms: u64) -> Result<(), EngineError> {
        validate_tick_period(period_ms)?;
        let period = Duration::from_millis(period_ms);
        self.period_tx.send_if_modified(|current| {
            if *current == period {
                return false;
            }
            *current = period;
            true
        });
        debug!(period_ms, "Tick period updated");
        Ok(())
    }

    pub fn period(&self) -> Duration {
        *self.period_tx.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .as_ref()
            .map(|r| !r.join.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Some(current) = self.running.get_mut().take() {
            let _ = current.stop_tx.send(true);
        }
    }
}

async fn run_loop(
    job: Arc<dyn TickJob>,
    mut period_rx: watch::Receiver<Duration>,
    mut stop_rx: watch::Receiver<bool>,
    metrics: EngineMetrics,
) {
    let mut period = *period_rx.borrow_and_update();
    let mut next_due = Instant::now() + period;
    let mut ticker = interval_at(next_due, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
            }

            changed = period_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                // The pending firing keeps its deadline, unless an overrun already
                // pushed it into the past
                let due = next_firing(next_due, period, Instant::now());
                period = *period_rx.borrow_and_update();
                next_due = due;
                ticker = interval_at(due, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            }

            scheduled = ticker.tick() => {
                if *stop_rx.borrow() {
                    break;
                }

                let started = Instant::now();
                if catch_unwind(AssertUnwindSafe(|| job.run_tick())).is_err() {
                    error!("Tick job panicked; scheduler continues");
                }
                let elapsed = started.elapsed();

                next_due = scheduled + period;
                if elapsed > period {
                    let missed = (elapsed.as_nanos() / period.as_nanos().max(1)) as u64;
                    metrics.ticks_skipped.inc_by(missed);
                    debug!(
                        elapsed_ms = elapsed.as_millis() as u64,
                        period_ms = period.as_millis() as u64,
                        missed,
                        "Tick overran its period, skipping missed firings"
                    );
                }
            }
        }
    }

    debug!("Scheduler loop exited");
}

/// First firing on the `due + k * period` grid that is not before `now`
fn next_firing(due: Instant, period: Duration, now: Instant) -> Instant {
    if due >= now || period.is_zero() {
        return due;
    }
    let behind = now.duration_since(due).as_nanos();
    let steps = behind.div_ceil(period.as_nanos());
    due + Duration::from_nanos((steps * period.as_nanos()) as u64)
}
