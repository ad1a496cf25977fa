//! Feed engine
//!
//! ```text
//!                    ┌──────────────┐   Inbox    ┌──────────────┐
//!   advisory  ─────► │ SourcePoller │ ─────────► │   Pipeline   │
//!   liquidity ─────► │ (own task)   │            │ (sync tick)  │
//!                    └──────────────┘            └──────┬───────┘
//!                           ▲ latest                    │ Snapshot
//!                           │                    ┌──────▼───────┐
//!   Scheduler (interval, Skip) ── run_tick ────► │ SnapshotHub  │ ──► consumers
//!                                                └──────────────┘
//! ```
//!
//! - `pipeline`: one tick across every instrument, no I/O
//! - `scheduler`: fixed-period driver with skip-on-overlap
//! - `hub`: latest-value fan-out with monotonic tick ordinals
//! - `poller`: time-boxed source calls with fallbacks
//! - `snapshot` / `inbox`: data handed between the above

pub mod hub;
pub mod inbox;
pub mod pipeline;
pub mod poller;
pub mod scheduler;
pub mod snapshot;

pub use hub::{SnapshotHub, Subscription, SubscriptionHandle};
pub use inbox::Inbox;
pub use pipeline::{Pipeline, TickReport};
pub use poller::{PollReport, SourcePoller};
pub use scheduler::{Scheduler, TickJob};
pub use snapshot::{InstrumentSnapshot, Snapshot};

use crate::config::Config;
use crate::core::{now_ms, EngineError};
use crate::market::{PriceModel, RandomWalk};
use crate::monitoring::EngineMetrics;
use crate::sources::{HttpInsightSource, HttpLiquiditySource, InsightSource, LiquiditySource};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

/// Pipeline plus hub, driven by the scheduler
struct EngineCore<P: PriceModel> {
    pipeline: Mutex<Pipeline<P>>,
    hub: SnapshotHub,
    status_interval: u64,
}

impl<P: PriceModel + 'static> TickJob for EngineCore<P> {
    fn run_tick(&self) {
        // Publish under the pipeline lock so ordinals reach the hub in order
        let mut pipeline = self.pipeline.lock();
        let report = pipeline.tick(now_ms());
        let tick = report.snapshot.tick;
        let failures = report.failures.len();
        self.hub.publish(report.snapshot);

        if self.status_interval > 0 && tick % self.status_interval == 0 {
            let metrics = pipeline.metrics();
            info!(
                tick,
                failures,
                subscribers = self.hub.subscriber_count(),
                skipped = metrics.ticks_skipped.get(),
                published = metrics.ticks_published.get(),
                "Engine status"
            );
        }
    }
}

/// Builder for [`Engine`]
pub struct EngineBuilder<P: PriceModel = RandomWalk> {
    config: Config,
    model: P,
    insight_source: Option<Arc<dyn InsightSource>>,
    liquidity_source: Option<Arc<dyn LiquiditySource>>,
    metrics: Option<EngineMetrics>,
}

impl EngineBuilder<RandomWalk> {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            model: RandomWalk,
            insight_source: None,
            liquidity_source: None,
            metrics: None,
        }
    }
}

impl<P: PriceModel + 'static> EngineBuilder<P> {
    /// Swap the price process
    pub fn price_model<Q: PriceModel + 'static>(self, model: Q) -> EngineBuilder<Q> {
        EngineBuilder {
            config: self.config,
            model,
            insight_source: self.insight_source,
            liquidity_source: self.liquidity_source,
            metrics: self.metrics,
        }
    }

    /// Use `source` instead of the configured advisory URL
    pub fn insight_source(mut self, source: Arc<dyn InsightSource>) -> Self {
        self.insight_source = Some(source);
        self
    }

    /// Use `source` instead of the configured liquidity URL
    pub fn liquidity_source(mut self, source: Arc<dyn LiquiditySource>) -> Self {
        self.liquidity_source = Some(source);
        self
    }

    pub fn metrics(mut self, metrics: EngineMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self) -> Result<Engine<P>, EngineError> {
        let config = self.config;
        config.validate()?;

        let metrics = match self.metrics {
            Some(m) => m,
            None => EngineMetrics::new().map_err(|e| EngineError::invalid("metrics", e.to_string()))?,
        };

        let pipeline = Pipeline::build(&config, self.model, metrics.clone())?;
        let hub = SnapshotHub::new(pipeline.snapshot(), metrics.clone());

        let timeout = config.sources.timeout();
        let insight_source = match (self.insight_source, &config.sources.advisory_url) {
            (Some(source), _) => Some(source),
            (None, Some(url)) => {
                let source = HttpInsightSource::new(url.clone(), timeout)
                    .map_err(|e| EngineError::invalid("sources.advisory_url", e.to_string()))?;
                Some(Arc::new(source) as Arc<dyn InsightSource>)
            }
            (None, None) => None,
        };
        let liquidity_source = match (self.liquidity_source, &config.sources.liquidity_url) {
            (Some(source), _) => Some(source),
            (None, Some(url)) => {
                let source = HttpLiquiditySource::new(url.clone(), timeout)
                    .map_err(|e| EngineError::invalid("sources.liquidity_url", e.to_string()))?;
                Some(Arc::new(source) as Arc<dyn LiquiditySource>)
            }
            (None, None) => None,
        };

        let mut poller = SourcePoller::new(
            &config.sources,
            config.engine.rng_seed,
            pipeline.inbox(),
            hub.clone(),
            metrics.clone(),
        );
        if let Some(source) = insight_source {
            poller = poller.with_insight_source(source);
        }
        if let Some(source) = liquidity_source {
            poller = poller.with_liquidity_source(source);
        }

        let scheduler = Scheduler::new(config.engine.tick_period_ms, metrics.clone())?;

        info!(
            instruments = pipeline.registry().len(),
            tick_period_ms = config.engine.tick_period_ms,
            model = pipeline.model().name(),
            "Engine built"
        );

        let core = Arc::new(EngineCore {
            pipeline: Mutex::new(pipeline),
            hub: hub.clone(),
            status_interval: config.engine.status_log_interval_ticks,
        });

        Ok(Engine {
            config,
            core,
            hub,
            scheduler,
            poller: Arc::new(tokio::sync::Mutex::new(poller)),
            poller_stop: Mutex::new(None),
            metrics,
        })
    }
}

/// Synthetic market feed engine
///
/// Owns the tick pipeline, the scheduler that drives it, the source poller
/// and the snapshot hub consumers read from. Nothing ticks until
/// [`Engine::start`]; the seed snapshot is available immediately.
pub struct Engine<P: PriceModel + 'static = RandomWalk> {
    config: Config,
    core: Arc<EngineCore<P>>,
    hub: SnapshotHub,
    scheduler: Scheduler,
    poller: Arc<tokio::sync::Mutex<SourcePoller>>,
    poller_stop: Mutex<Option<watch::Sender<bool>>>,
    metrics: EngineMetrics,
}

impl Engine<RandomWalk> {
    pub fn new(config: Config) -> Result<Self, EngineError> {
        EngineBuilder::new(config).build()
    }

    pub fn builder(config: Config) -> EngineBuilder<RandomWalk> {
        EngineBuilder::new(config)
    }
}

impl<P: PriceModel + 'static> Engine<P> {
    /// Begin ticking and polling
    ///
    /// Returns `Ok(false)` if already running. Requires a tokio runtime.
    pub fn start(&self) -> Result<bool, EngineError> {
        let job: Arc<dyn TickJob> = self.core.clone();
        let started = self.scheduler.start(job)?;
        if started {
            self.start_poller();
        }
        Ok(started)
    }

    /// Begin ticking every `period_ms`
    ///
    /// An out-of-range period is rejected before anything starts. If the
    /// engine is already running this returns `Ok(false)` and the period is
    /// left unchanged; use [`Engine::set_tick_period`] for a live change.
    pub fn start_with_period(&self, period_ms: u64) -> Result<bool, EngineError> {
        let job: Arc<dyn TickJob> = self.core.clone();
        let started = self.scheduler.start_with_period(job, period_ms)?;
        if started {
            self.start_poller();
        }
        Ok(started)
    }

    fn start_poller(&self) {
        let (stop_tx, stop_rx) = watch::channel(false);
        if let Some(previous) = self.poller_stop.lock().replace(stop_tx) {
            let _ = previous.send(true);
        }

        let poller = Arc::clone(&self.poller);
        let interval = self.config.sources.poll_interval();
        tokio::spawn(async move {
            let mut poller = poller.lock().await;
            poller.run(interval, stop_rx).await;
        });
    }

    /// Stop ticking and polling; idempotent
    ///
    /// A tick already in progress completes and is published.
    pub fn stop(&self) -> bool {
        let stopped = self.scheduler.stop();
        if let Some(stop_tx) = self.poller_stop.lock().take() {
            let _ = stop_tx.send(true);
        }
        stopped
    }

    /// Stop and wait for the background tasks to exit
    pub async fn shutdown(&self) {
        let stop_tx = self.poller_stop.lock().take();
        if let Some(stop_tx) = stop_tx {
            let _ = stop_tx.send(true);
        }
        self.scheduler.shutdown().await;
        // The poller task holds this lock until it exits
        drop(self.poller.lock().await);
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Change the tick period
    ///
    /// Rejected periods leave the engine untouched.
    pub fn set_tick_period(&self, period_ms: u64) -> Result<(), EngineError> {
        self.scheduler.set_period(period_ms)
    }

    pub fn tick_period(&self) -> Duration {
        self.scheduler.period()
    }

    /// Run one tick immediately, outside the scheduler
    pub fn tick_now(&self) -> Arc<Snapshot> {
        self.core.run_tick();
        self.hub.latest()
    }

    /// Poll the sources once from the caller's task
    ///
    /// Returns `None` while the background poller is running.
    pub async fn poll_sources_now(&self) -> Option<PollReport> {
        let mut poller = self.poller.try_lock().ok()?;
        Some(poller.poll_once().await)
    }

    /// Latest published snapshot; the seed snapshot before the first tick
    pub fn latest_snapshot(&self) -> Arc<Snapshot> {
        self.hub.latest()
    }

    pub fn subscribe(&self, consumer_id: impl Into<String>) -> Subscription {
        self.hub.subscribe(consumer_id)
    }

    pub fn subscribe_fn<F>(
        &self,
        consumer_id: impl Into<String>,
        callback: F,
    ) -> Result<SubscriptionHandle, EngineError>
    where
        F: FnMut(&Arc<Snapshot>, &SubscriptionHandle) + Send + 'static,
    {
        self.hub.subscribe_fn(consumer_id, callback)
    }

    pub fn hub(&self) -> &SnapshotHub {
        &self.hub
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Registered symbols in registration order
    pub fn symbols(&self) -> Vec<String> {
        self.core.pipeline.lock().registry().symbols().map(str::to_string).collect()
    }
}

impl<P: PriceModel + 'static> Drop for Engine<P> {
    fn drop(&mut self) {
        self.stop();
    }
}
