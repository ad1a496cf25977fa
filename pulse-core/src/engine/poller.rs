//! Background polling of the advisory and liquidity sources
//!
//! Every call is time-boxed and gated by a per-source circuit breaker. On
//! any failure the poller substitutes a fallback (locally generated insights,
//! or an `Unavailable` liquidity outcome that the aggregator turns into a
//! bounded perturbation) so the tick pipeline always has something to use.
//! Results are posted to the shared [`Inbox`]; the tick never waits for I/O.

use super::hub::SnapshotHub;
use super::inbox::Inbox;
use crate::config::SourcesConfig;
use crate::core::{InsightEvent, SourceError};
use crate::market::LiquidityInput;
use crate::monitoring::EngineMetrics;
use crate::resilience::{CircuitBreaker, CircuitBreakerConfig};
use crate::sources::{
    FallbackInsightGenerator, InsightRequest, InsightSource, LiquidityFigures, LiquiditySource,
    MarketMove,
};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

const ADVISORY: &str = "advisory";
const LIQUIDITY: &str = "liquidity";

/// What one poll round produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PollReport {
    pub insights_posted: usize,
    pub insights_fell_back: bool,
    pub liquidity_fresh: bool,
}

pub struct SourcePoller {
    insights: Option<Arc<dyn InsightSource>>,
    liquidity: Option<Arc<dyn LiquiditySource>>,
    insight_breaker: CircuitBreaker,
    liquidity_breaker: CircuitBreaker,
    fallback: FallbackInsightGenerator,
    rng: StdRng,
    request: InsightRequest,
    horizon_days: u32,
    timeout: Duration,
    inbox: Arc<Mutex<Inbox>>,
    hub: SnapshotHub,
    metrics: EngineMetrics,
}

impl SourcePoller {
    pub fn new(
        config: &SourcesConfig,
        rng_seed: Option<u64>,
        inbox: Arc<Mutex<Inbox>>,
        hub: SnapshotHub,
        metrics: EngineMetrics,
    ) -> Self {
        let breaker_config = CircuitBreakerConfig::from(config);
        // Separate stream from the pipeline so polling never perturbs a seeded replay
        let rng = match rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(0x9E37_79B9_7F4A_7C15)),
            None => StdRng::from_entropy(),
        };

        Self {
            insights: None,
            liquidity: None,
            insight_breaker: CircuitBreaker::new(ADVISORY, breaker_config.clone()),
            liquidity_breaker: CircuitBreaker::new(LIQUIDITY, breaker_config),
            fallback: FallbackInsightGenerator::new(),
            rng,
            request: InsightRequest {
                limit: config.insight_limit,
                severity_filter: config.severity_filter,
            },
            horizon_days: config.horizon_days,
            timeout: config.timeout(),
            inbox,
            hub,
            metrics,
        }
    }

    pub fn with_insight_source(mut self, source: Arc<dyn InsightSource>) -> Self {
        self.insights = Some(source);
        self
    }

    pub fn with_liquidity_source(mut self, source: Arc<dyn LiquiditySource>) -> Self {
        self.liquidity = Some(source);
        self
    }

    pub fn insight_breaker(&self) -> &CircuitBreaker {
        &self.insight_breaker
    }

    pub fn liquidity_breaker(&self) -> &CircuitBreaker {
        &self.liquidity_breaker
    }

    /// Locally generated insights so far
    pub fn fallback_count(&self) -> u64 {
        self.fallback.generated()
    }

    /// Poll both sources once and post the outcomes
    pub async fn poll_once(&mut self) -> PollReport {
        let insight_call = async {
            match &self.insights {
                Some(source) => {
                    guarded(&self.insight_breaker, self.timeout, source.fetch(&self.request)).await
                }
                None => Err(SourceError::NotConfigured),
            }
        };
        let liquidity_call = async {
            match &self.liquidity {
                Some(source) => {
                    guarded(&self.liquidity_breaker, self.timeout, source.fetch(self.horizon_days))
                        .await
                }
                None => Err(SourceError::NotConfigured),
            }
        };
        let (insight_result, liquidity_result) = tokio::join!(insight_call, liquidity_call);

        let (insights, insights_fell_back) = self.resolve_insights(insight_result);
        let liquidity = self.resolve_liquidity(liquidity_result);
        let liquidity_fresh = matches!(liquidity, LiquidityInput::Fresh(_));

        let report = PollReport {
            insights_posted: insights.len(),
            insights_fell_back,
            liquidity_fresh,
        };

        let mut inbox = self.inbox.lock();
        inbox.post_insights(insights);
        inbox.post_liquidity(liquidity);
        report
    }

    fn resolve_insights(
        &mut self,
        result: Result<Vec<InsightEvent>, SourceError>,
    ) -> (Vec<InsightEvent>, bool) {
        match result {
            Ok(insights) => {
                self.metrics.record_call(ADVISORY, true);
                (insights, false)
            }
            Err(err) => {
                self.note_failure(ADVISORY, &err);
                let latest = self.hub.latest();
                let moves: Vec<MarketMove> = latest
                    .instruments
                    .iter()
                    .filter(|i| !i.stale)
                    .map(|i| MarketMove {
                        symbol: i.instrument.symbol.clone(),
                        change_pct: i.price.change_pct,
                    })
                    .collect();
                let generated = self.fallback.generate(&self.request, &moves, &mut self.rng);
                (generated, true)
            }
        }
    }

    fn resolve_liquidity(&mut self, result: Result<LiquidityFigures, SourceError>) -> LiquidityInput {
        match result {
            Ok(figures) => {
                self.metrics.record_call(LIQUIDITY, true);
                LiquidityInput::Fresh(figures)
            }
            Err(err) => {
                self.note_failure(LIQUIDITY, &err);
                LiquidityInput::Unavailable
            }
        }
    }

    fn note_failure(&self, source: &'static str, err: &SourceError) {
        match err {
            SourceError::NotConfigured => {}
            SourceError::CircuitOpen => {
                debug!(source, "Circuit open, using fallback");
            }
            _ => {
                self.metrics.record_call(source, false);
                warn!(source, error = %err, "Source call failed, using fallback");
            }
        }
        self.metrics.record_fallback(source, err.kind());
    }

    /// Poll every `interval` until `stop` flips to true
    pub async fn run(&mut self, interval: Duration, mut stop: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            interval_ms = interval.as_millis() as u64,
            advisory = self.insights.is_some(),
            liquidity = self.liquidity.is_some(),
            "Source poller started"
        );

        loop {
            tokio::select! {
                biased;

                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }

                _ = ticker.tick() => {
                    let report = self.poll_once().await;
                    debug!(?report, "Poll round complete");
                }
            }
        }

        info!("Source poller stopped");
    }
}

/// Run `call` under the breaker and a time box, recording the outcome
async fn guarded<T, F>(breaker: &CircuitBreaker, timeout: Duration, call: F) -> Result<T, SourceError>
where
    F: Future<Output = Result<T, SourceError>>,
{
    if !breaker.is_call_permitted() {
        return Err(SourceError::CircuitOpen);
    }

    let result = match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(SourceError::Timeout(timeout)),
    };

    match &result {
        Ok(_) => breaker.record_success(),
        Err(_) => breaker.record_failure(),
    }
    result
}
