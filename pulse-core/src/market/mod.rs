//! Market-state building blocks used by the tick pipeline
//!
//! - `registry`: static instrument catalog
//! - `price`: bounded random-walk price process
//! - `orderbook`: synthetic depth ladder
//! - `window`: bucket-keyed sliding window (chart series, metric histories)
//! - `event_log`: capped most-recent-first log (trades, insights)
//! - `kpi`: rolled-up business metrics

pub mod event_log;
pub mod kpi;
pub mod orderbook;
pub mod price;
pub mod registry;
pub mod window;

pub use event_log::BoundedLog;
pub use kpi::{LiquidityInput, MetricKey, MetricPoint, MetricSample, MetricsAggregator, TickInputs};
pub use orderbook::{synthesize, OrderBook, OrderBookLevel};
pub use price::{PriceModel, RandomWalk};
pub use registry::InstrumentRegistry;
pub use window::{AppendOutcome, Bucketed, SlidingWindow};

use crate::core::{ChartPoint, TimeBucket};

impl Bucketed for ChartPoint {
    fn bucket(&self) -> TimeBucket {
        self.bucket
    }
}
