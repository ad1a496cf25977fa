//! Synchronous tick pipeline
//!
//! One call to [`Pipeline::tick`] advances every instrument by exactly one
//! step and returns the resulting [`Snapshot`]:
//!
//! ```text
//! for each instrument (registration order):
//!     price  = model.step(prev)          ──► error? keep prev, mark stale
//!     book   = synthesize(price)
//!     chart  = window.append(point)      (same bucket coalesces)
//!     trade? = p(trade_probability)      ──► trade log
//! drain inbox                            ──► insight log, liquidity input
//! metrics.refresh(prices, logs, liquidity)
//! snapshot
//! ```
//!
//! The pipeline never performs I/O. External data only arrives through the
//! [`Inbox`], which the source poller fills between ticks.

use super::inbox::Inbox;
use super::snapshot::{InstrumentSnapshot, Snapshot};
use crate::config::constants::{EXECUTORS, TICK_VOLUME_RANGE, TRADE_SIZE_RANGE};
use crate::config::Config;
use crate::core::{
    ChartPoint, EngineError, InsightEvent, Instrument, PriceState, Side, StepError, TimeBucket,
    TradeEvent,
};
use crate::market::{
    synthesize, BoundedLog, InstrumentRegistry, MetricsAggregator, OrderBook, PriceModel,
    RandomWalk, SlidingWindow, TickInputs,
};
use crate::monitoring::EngineMetrics;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Per-instrument mutable state
#[derive(Debug, Clone)]
struct InstrumentState {
    instrument: Arc<Instrument>,
    price: PriceState,
    book: OrderBook,
    chart: SlidingWindow<ChartPoint>,
    stale: bool,
}

/// Result of one tick
#[derive(Debug)]
pub struct TickReport {
    pub snapshot: Snapshot,
    /// Instruments whose step failed this tick
    pub failures: Vec<StepError>,
    pub trades_printed: usize,
    pub insights_received: usize,
}

pub struct Pipeline<P: PriceModel = RandomWalk> {
    config: Config,
    registry: InstrumentRegistry,
    model: P,
    rng: StdRng,
    states: Vec<InstrumentState>,
    trades: BoundedLog<TradeEvent>,
    insights: BoundedLog<InsightEvent>,
    aggregator: MetricsAggregator,
    inbox: Arc<Mutex<Inbox>>,
    metrics: EngineMetrics,
    tick: u64,
    last_timestamp_ms: u64,
    next_trade_id: u64,
}

impl Pipeline<RandomWalk> {
    pub fn new(config: &Config) -> Result<Self, EngineError> {
        Self::with_model(config, RandomWalk)
    }
}

impl<P: PriceModel> Pipeline<P> {
    pub fn with_model(config: &Config, model: P) -> Result<Self, EngineError> {
        let metrics = EngineMetrics::new()
            .map_err(|e| EngineError::invalid("metrics", e.to_string()))?;
        Self::build(config, model, metrics)
    }

    /// Build with a shared metrics registry
    pub fn build(config: &Config, model: P, metrics: EngineMetrics) -> Result<Self, EngineError> {
        config.validate()?;

        let registry = InstrumentRegistry::new(config.instruments.clone())?;
        let mut rng = match config.engine.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut states = Vec::with_capacity(registry.len());
        for instrument in registry.iter() {
            let price = PriceState::opening(instrument);
            let book = synthesize(
                price.price,
                config.book.depth,
                config.book.spread_fraction,
                config.book.step_fraction,
                &mut rng,
            );
            states.push(InstrumentState {
                instrument: Arc::clone(instrument),
                price,
                book,
                chart: SlidingWindow::new(config.chart.capacity)?,
                stale: false,
            });
        }

        let aggregator = MetricsAggregator::new(
            config.metrics.history_capacity,
            config.metrics.initial_liquidity,
            config.metrics.fallback_jitter,
        )?;

        debug!(
            instruments = registry.len(),
            model = model.name(),
            seeded = config.engine.rng_seed.is_some(),
            "Pipeline initialized"
        );

        Ok(Self {
            config: config.clone(),
            registry,
            model,
            rng,
            states,
            trades: BoundedLog::new(config.logs.trade_capacity)?,
            insights: BoundedLog::new(config.logs.insight_capacity)?,
            aggregator,
            inbox: Arc::new(Mutex::new(Inbox::new())),
            metrics,
            tick: 0,
            last_timestamp_ms: crate::core::now_ms(),
            next_trade_id: 1,
        })
    }

    pub fn registry(&self) -> &InstrumentRegistry {
        &self.registry
    }

    /// Shared inbox the source poller writes into
    pub fn inbox(&self) -> Arc<Mutex<Inbox>> {
        Arc::clone(&self.inbox)
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    /// Ticks completed so far
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn model(&self) -> &P {
        &self.model
    }

    /// Snapshot of the current state without advancing
    ///
    /// Before the first tick this is the seed snapshot (tick 0).
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            tick: self.tick,
            timestamp_ms: self.last_timestamp_ms,
            instruments: self
                .states
                .iter()
                .map(|s| InstrumentSnapshot {
                    instrument: Instrument::clone(&s.instrument),
                    price: s.price.clone(),
                    book: s.book.clone(),
                    chart: s.chart.to_vec(),
                    stale: s.stale,
                })
                .collect(),
            trades: self.trades.to_vec(),
            insights: self.insights.to_vec(),
            metrics: self.aggregator.metrics().to_vec(),
        }
    }

    /// Advance every instrument by one step
    pub fn tick(&mut self, now_ms: u64) -> TickReport {
        let started = Instant::now();
        let bucket = TimeBucket::of(now_ms, self.config.chart.bucket_ms);
        let volatility = self.config.engine.volatility;

        let mut failures = Vec::new();
        let mut trades_printed = 0;

        for idx in 0..self.states.len() {
            let reference_open = self.states[idx].instrument.baseline_price;
            let prev = &self.states[idx].price;

            let model = &mut self.model;
            let rng = &mut self.rng;
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                model.step(prev, reference_open, volatility, rng)
            }))
            .unwrap_or_else(|_| {
                Err(StepError::Model {
                    symbol: prev.symbol.clone(),
                    reason: "price model panicked".to_string(),
                })
            });

            match outcome {
                Ok(next) => {
                    self.apply_step(idx, next, bucket, now_ms);
                    if self.maybe_print_trade(idx, now_ms) {
                        trades_printed += 1;
                    }
                }
                Err(err) => {
                    let state = &mut self.states[idx];
                    state.stale = true;
                    warn!(
                        symbol = %state.instrument.symbol,
                        error = %err,
                        "Price step failed, carrying previous state"
                    );
                    self.metrics
                        .step_failures
                        .with_label_values(&[state.instrument.symbol.as_str()])
                        .inc();
                    failures.push(err);
                }
            }
        }

        let (new_insights, liquidity) = self.inbox.lock().drain();
        let insights_received = new_insights.len();
        self.insights.extend(new_insights);

        let prices: Vec<PriceState> = self.states.iter().map(|s| s.price.clone()).collect();
        let inputs = TickInputs {
            prices: &prices,
            trades: &self.trades,
            insights: &self.insights,
            mean_sentiment: self.mean_sentiment(),
            liquidity,
            bucket,
        };
        self.aggregator.refresh(&inputs, &mut self.rng);

        self.tick += 1;
        self.last_timestamp_ms = now_ms;

        let snapshot = self.snapshot();
        self.metrics
            .tick_duration
            .observe(started.elapsed().as_secs_f64());

        TickReport {
            snapshot,
            failures,
            trades_printed,
            insights_received,
        }
    }

    fn apply_step(&mut self, idx: usize, next: PriceState, bucket: TimeBucket, now_ms: u64) {
        let book_cfg = &self.config.book;
        let noise = self.config.chart.prediction_noise;
        let rng = &mut self.rng;
        let state = &mut self.states[idx];

        state.book = synthesize(
            next.price,
            book_cfg.depth,
            book_cfg.spread_fraction,
            book_cfg.step_fraction,
            rng,
        );

        let (min_vol, max_vol) = TICK_VOLUME_RANGE;
        let mut volume = rng.gen_range(min_vol..max_vol);
        if let Some(last) = state.chart.last() {
            if last.bucket == bucket {
                volume += last.volume;
            }
        }

        let predicted = if noise > 0.0 {
            next.price * (1.0 + rng.gen_range(-noise..=noise))
        } else {
            next.price
        };

        state.chart.append(ChartPoint {
            bucket,
            timestamp_ms: now_ms,
            price: next.price,
            volume,
            predicted,
            sentiment: (next.change_pct / 2.0).tanh(),
        });

        state.price = next;
        state.stale = false;
    }

    fn maybe_print_trade(&mut self, idx: usize, now_ms: u64) -> bool {
        let probability = self.config.engine.trade_probability;
        if probability <= 0.0 || !self.rng.gen_bool(probability.min(1.0)) {
            return false;
        }

        let state = &self.states[idx];
        let side = if self.rng.gen_bool(0.5) { Side::Buy } else { Side::Sell };
        let price = match side {
            Side::Buy => state.book.best_ask().map(|l| l.price),
            Side::Sell => state.book.best_bid().map(|l| l.price),
        }
        .unwrap_or(state.price.price);

        let (min_size, max_size) = TRADE_SIZE_RANGE;
        let executed_by = EXECUTORS
            .choose(&mut self.rng)
            .copied()
            .unwrap_or("Market Maker");

        let trade = TradeEvent {
            id: self.next_trade_id,
            symbol: state.instrument.symbol.clone(),
            price,
            size: self.rng.gen_range(min_size..max_size),
            side,
            executed_by: executed_by.to_string(),
            timestamp_ms: now_ms,
        };
        self.next_trade_id += 1;
        self.trades.push(trade);
        true
    }

    fn mean_sentiment(&self) -> f64 {
        let latest: Vec<f64> = self
            .states
            .iter()
            .filter_map(|s| s.chart.last().map(|p| p.sentiment))
            .collect();
        if latest.is_empty() {
            0.0
        } else {
            latest.iter().sum::<f64>() / latest.len() as f64
        }
    }
}
