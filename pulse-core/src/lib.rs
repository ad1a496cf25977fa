//! Pulse Core - Synthetic Real-Time Market Feed Engine
//!
//! Pulse produces a continuously updating, internally consistent picture of a
//! simulated market: prices, order books, chart series, trade and insight
//! logs, and rolled-up business metrics. Consumers (dashboards, exporters,
//! tests) read immutable snapshots published once per tick.
//!
//! ## Architecture
//! - **One tick, one snapshot**: every derived view is computed from the same
//!   price step, so consumers never see a book from tick N next to a chart
//!   from tick N-1
//! - **Non-blocking fan-out**: slow consumers observe fewer, newer snapshots
//! - **No I/O in the tick**: external sources are polled on their own task
//!   and degrade to local fallbacks
//! - **Bounded memory**: every series and log has a fixed capacity
//! - **Reproducible**: a seeded RNG replays the exact same price path
//!
//! ## Core Modules
//! - `core`: domain types and error families
//! - `config`: TOML + environment configuration with validation
//! - `market`: price process, order book, sliding windows, event logs, metrics
//! - `sources`: advisory and liquidity clients plus the local fallback
//! - `engine`: tick pipeline, scheduler, snapshot hub, source poller
//! - `resilience`: per-source circuit breaker
//! - `monitoring`: Prometheus metrics and scrape endpoint
//! - `testing`: mocks and builders for tests

pub mod config;
pub mod core;
pub mod engine;
pub mod market;
pub mod monitoring;
pub mod resilience;
pub mod sources;
pub mod testing;
pub mod utils;

pub use crate::config::Config;
pub use crate::core::{
    ChartPoint, EngineError, InsightEvent, Instrument, PriceState, Severity, Side, SourceError,
    StepError, TradeEvent,
};
pub use engine::{
    Engine, EngineBuilder, InstrumentSnapshot, Snapshot, Subscription, SubscriptionHandle,
};
pub use market::{MetricKey, OrderBook, PriceModel, RandomWalk};
pub use monitoring::EngineMetrics;

// Re-export error types
pub use anyhow::{Error, Result};
