//! Domain types shared by every stage of the tick pipeline
//!
//! Everything here is plain data: `Clone`, serde-serializable, and owned by
//! whichever stage produced it. Timestamps are Unix epoch milliseconds.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Smallest price the generator will ever emit
pub const MIN_PRICE: f64 = 1e-8;

/// Coarse time bucket used to key chart points and metric histories
///
/// A bucket is `timestamp_ms / bucket_ms`, so two ticks inside the same
/// minute (with the default one-minute bucket) share a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeBucket(pub u64);

impl TimeBucket {
    /// Bucket containing `timestamp_ms` for buckets of width `bucket_ms`
    #[inline]
    pub fn of(timestamp_ms: u64, bucket_ms: u64) -> Self {
        Self(timestamp_ms / bucket_ms.max(1))
    }

    /// Start of the bucket in epoch milliseconds
    #[inline]
    pub fn start_ms(&self, bucket_ms: u64) -> u64 {
        self.0.saturating_mul(bucket_ms)
    }
}

impl fmt::Display for TimeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Tradable instrument, immutable after registration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: String,
    pub display_name: String,
    pub sector: String,
    pub baseline_price: f64,
}

impl Instrument {
    pub fn new(
        symbol: impl Into<String>,
        display_name: impl Into<String>,
        sector: impl Into<String>,
        baseline_price: f64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            display_name: display_name.into(),
            sector: sector.into(),
            baseline_price,
        }
    }
}

/// Current price state of one instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceState {
    pub symbol: String,
    pub price: f64,
    pub day_high: f64,
    pub day_low: f64,
    pub change_abs: f64,
    pub change_pct: f64,
}

impl PriceState {
    /// Opening state: price at baseline, no change, high == low == price
    pub fn opening(instrument: &Instrument) -> Self {
        Self {
            symbol: instrument.symbol.clone(),
            price: instrument.baseline_price,
            day_high: instrument.baseline_price,
            day_low: instrument.baseline_price,
            change_abs: 0.0,
            change_pct: 0.0,
        }
    }

    /// Intraday range as a fraction of the low
    pub fn day_range_fraction(&self) -> f64 {
        if self.day_low > 0.0 {
            (self.day_high - self.day_low) / self.day_low
        } else {
            0.0
        }
    }
}

/// Side of an order book level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookSide {
    Bid,
    Ask,
}

/// Aggressor side of a trade print
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

/// One sample of a per-instrument chart series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub bucket: TimeBucket,
    pub timestamp_ms: u64,
    pub price: f64,
    pub volume: f64,
    /// Forecast derived from `price`; never fed back into the price process
    pub predicted: f64,
    /// In (-1, 1)
    pub sentiment: f64,
}

/// Synthetic trade print
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    pub id: u64,
    pub symbol: String,
    pub price: f64,
    pub size: f64,
    pub side: Side,
    pub executed_by: String,
    pub timestamp_ms: u64,
}

impl TradeEvent {
    #[inline]
    pub fn notional(&self) -> f64 {
        self.price * self.size
    }
}

/// Insight severity, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Insight category as reported by the advisory service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightCategory {
    Opportunity,
    Risk,
    Trend,
    Anomaly,
}

/// Advisory insight, from the external service or the local fallback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightEvent {
    pub id: String,
    pub category: InsightCategory,
    pub severity: Severity,
    pub message: String,
    /// In [0, 1]
    pub confidence: f64,
    #[serde(default)]
    pub related_symbol: Option<String>,
    #[serde(default)]
    pub timestamp_ms: u64,
}

/// Current epoch milliseconds (0 if the clock is before the epoch)
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
