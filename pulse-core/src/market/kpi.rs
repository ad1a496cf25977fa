//! Rolled-up business metrics with bounded histories
//!
//! Each metric keeps its current value, the percentage trend versus the
//! previous value, and a `SlidingWindow` history (same eviction and same-bucket
//! coalescing as chart series).

use super::event_log::BoundedLog;
use super::window::{Bucketed, SlidingWindow};
use crate::core::{EngineError, InsightEvent, PriceState, TimeBucket, TradeEvent};
use crate::sources::LiquidityFigures;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Metrics maintained by the aggregator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKey {
    TotalLiquidity,
    RiskScore,
    TradedVolume,
    MarketSentiment,
    AdvisoryConfidence,
}

impl MetricKey {
    pub const ALL: [MetricKey; 5] = [
        MetricKey::TotalLiquidity,
        MetricKey::RiskScore,
        MetricKey::TradedVolume,
        MetricKey::MarketSentiment,
        MetricKey::AdvisoryConfidence,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::TotalLiquidity => "Total Liquidity",
            Self::RiskScore => "Risk Score",
            Self::TradedVolume => "Traded Volume",
            Self::MarketSentiment => "Market Sentiment",
            Self::AdvisoryConfidence => "AI Confidence",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Self::TotalLiquidity | Self::TradedVolume => "USD",
            Self::RiskScore => "score",
            Self::MarketSentiment | Self::AdvisoryConfidence => "%",
        }
    }
}

/// One history entry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub bucket: TimeBucket,
    pub value: f64,
}

impl Bucketed for MetricPoint {
    fn bucket(&self) -> TimeBucket {
        self.bucket
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub key: MetricKey,
    pub label: String,
    pub value: f64,
    pub unit: String,
    /// Percentage change from the previous value
    pub trend: f64,
    pub history: SlidingWindow<MetricPoint>,
}

impl MetricSample {
    pub fn new(key: MetricKey, initial: f64, capacity: usize) -> Result<Self, EngineError> {
        Ok(Self {
            key,
            label: key.label().to_string(),
            value: initial,
            unit: key.unit().to_string(),
            trend: 0.0,
            history: SlidingWindow::new(capacity)?,
        })
    }

    /// Set the value, recompute the trend and record it in the history
    pub fn update(&mut self, value: f64, bucket: TimeBucket) {
        self.trend = percent_change(self.value, value);
        self.value = value;
        self.history.append(MetricPoint { bucket, value });
    }
}

/// `(new - old) / |old| * 100`, or 0 when `old` is 0
pub fn percent_change(old: f64, new: f64) -> f64 {
    if old == 0.0 || !old.is_finite() {
        0.0
    } else {
        (new - old) / old.abs() * 100.0
    }
}

/// Perturb `last` by a uniform relative delta in `[-jitter, +jitter]`
pub fn perturb<R: RngCore + ?Sized>(last: f64, jitter: f64, rng: &mut R) -> f64 {
    if jitter <= 0.0 {
        return last;
    }
    let delta = rng.gen_range(-jitter..=jitter);
    (last * (1.0 + delta)).max(0.0)
}

/// Liquidity feed outcome for the current tick
#[derive(Debug, Clone, PartialEq)]
pub enum LiquidityInput {
    /// A poll succeeded since the last tick
    Fresh(LiquidityFigures),
    /// A poll failed or timed out since the last tick
    Unavailable,
    /// No poll completed since the last tick
    Pending,
}

/// Everything the aggregator reads from one tick
pub struct TickInputs<'a> {
    pub prices: &'a [PriceState],
    pub trades: &'a BoundedLog<TradeEvent>,
    pub insights: &'a BoundedLog<InsightEvent>,
    /// Mean chart sentiment across instruments, in (-1, 1)
    pub mean_sentiment: f64,
    pub liquidity: LiquidityInput,
    pub bucket: TimeBucket,
}

#[derive(Debug, Clone)]
pub struct MetricsAggregator {
    metrics: Vec<MetricSample>,
    fallback_jitter: f64,
    fallbacks: u64,
}

impl MetricsAggregator {
    pub fn new(
        history_capacity: usize,
        initial_liquidity: f64,
        fallback_jitter: f64,
    ) -> Result<Self, EngineError> {
        let metrics = MetricKey::ALL
            .iter()
            .map(|&key| {
                let initial = match key {
                    MetricKey::TotalLiquidity => initial_liquidity,
                    _ => 0.0,
                };
                MetricSample::new(key, initial, history_capacity)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            metrics,
            fallback_jitter,
            fallbacks: 0,
        })
    }

    pub fn get(&self, key: MetricKey) -> Option<&MetricSample> {
        self.metrics.iter().find(|m| m.key == key)
    }

    fn get_mut(&mut self, key: MetricKey) -> &mut MetricSample {
        let idx = MetricKey::ALL.iter().position(|k| *k == key).unwrap_or(0);
        &mut self.metrics[idx]
    }

    pub fn metrics(&self) -> &[MetricSample] {
        &self.metrics
    }

    /// Number of times the liquidity metric fell back to perturbation
    pub fn fallbacks(&self) -> u64 {
        self.fallbacks
    }

    /// Recompute every metric from one tick's state
    pub fn refresh<R: RngCore + ?Sized>(&mut self, inputs: &TickInputs<'_>, rng: &mut R) {
        let bucket = inputs.bucket;

        match &inputs.liquidity {
            LiquidityInput::Fresh(figures) => {
                self.get_mut(MetricKey::TotalLiquidity)
                    .update(figures.total_liquidity, bucket);
            }
            LiquidityInput::Unavailable => {
                let jitter = self.fallback_jitter;
                let metric = self.get_mut(MetricKey::TotalLiquidity);
                let value = perturb(metric.value, jitter, rng);
                metric.update(value, bucket);
                self.fallbacks += 1;
                debug!(value, "Liquidity feed unavailable, perturbed last known value");
            }
            LiquidityInput::Pending => {}
        }

        let risk = risk_score(inputs.prices);
        self.get_mut(MetricKey::RiskScore).update(risk, bucket);

        let volume: f64 = inputs.trades.iter().map(TradeEvent::notional).sum();
        self.get_mut(MetricKey::TradedVolume).update(volume, bucket);

        self.get_mut(MetricKey::MarketSentiment)
            .update(inputs.mean_sentiment.clamp(-1.0, 1.0) * 100.0, bucket);

        if !inputs.insights.is_empty() {
            let mean = inputs.insights.iter().map(|i| i.confidence).sum::<f64>()
                / inputs.insights.len() as f64;
            self.get_mut(MetricKey::AdvisoryConfidence)
                .update(mean.clamp(0.0, 1.0) * 100.0, bucket);
        }
    }
}

/// 0-100 score from mean absolute change and mean intraday range
///
/// A 1% move contributes 10 points, a 1% range 5 points.
pub fn risk_score(prices: &[PriceState]) -> f64 {
    if prices.is_empty() {
        return 0.0;
    }
    let n = prices.len() as f64;
    let mean_change = prices.iter().map(|p| p.change_pct.abs()).sum::<f64>() / n;
    let mean_range = prices.iter().map(|p| p.day_range_fraction() * 100.0).sum::<f64>() / n;
    (mean_change * 10.0 + mean_range * 5.0).clamp(0.0, 100.0)
}
