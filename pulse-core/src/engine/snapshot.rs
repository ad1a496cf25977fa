//! Immutable per-tick aggregate handed to consumers

use crate::core::{ChartPoint, InsightEvent, Instrument, PriceState, TradeEvent};
use crate::market::{MetricKey, MetricSample, OrderBook};
use serde::{Deserialize, Serialize};

/// One instrument's state at a tick boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentSnapshot {
    pub instrument: Instrument,
    pub price: PriceState,
    pub book: OrderBook,
    /// Oldest point first
    pub chart: Vec<ChartPoint>,
    /// The last price step failed; price, book and chart are carried over
    pub stale: bool,
}

/// Fully consistent engine state after one tick
///
/// Everything in a snapshot was computed from the same price step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Tick ordinal; 0 is the seed snapshot built at construction
    pub tick: u64,
    pub timestamp_ms: u64,
    /// Registration order
    pub instruments: Vec<InstrumentSnapshot>,
    /// Newest first
    pub trades: Vec<TradeEvent>,
    /// Newest first
    pub insights: Vec<InsightEvent>,
    pub metrics: Vec<MetricSample>,
}

impl Snapshot {
    pub fn instrument(&self, symbol: &str) -> Option<&InstrumentSnapshot> {
        self.instruments.iter().find(|i| i.instrument.symbol == symbol)
    }

    pub fn price(&self, symbol: &str) -> Option<f64> {
        self.instrument(symbol).map(|i| i.price.price)
    }

    pub fn metric(&self, key: MetricKey) -> Option<&MetricSample> {
        self.metrics.iter().find(|m| m.key == key)
    }

    /// Instruments whose last step failed
    pub fn stale_symbols(&self) -> impl Iterator<Item = &str> {
        self.instruments
            .iter()
            .filter(|i| i.stale)
            .map(|i| i.instrument.symbol.as_str())
    }

    pub fn is_seed(&self) -> bool {
        self.tick == 0
    }
}
