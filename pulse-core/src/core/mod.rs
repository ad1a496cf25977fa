//! Core types for the feed engine
//!
//! - `types`: instruments, price state, chart points, trade and insight events
//! - `errors`: engine, step and source error families

pub mod errors;
pub mod types;

pub use errors::{EngineError, SourceError, StepError};
pub use types::{
    now_ms, BookSide, ChartPoint, InsightCategory, InsightEvent, Instrument, PriceState,
    Severity, Side, TimeBucket, TradeEvent, MIN_PRICE,
};
