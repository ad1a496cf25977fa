//! Default constants for the synthetic feed
//!
//! Every value here is overridable through `Config`. Tick periods between
//! 100ms and 3s and volatilities between 0.001 and 0.008 all keep the
//! dashboards readable.

// ===== TICK SCHEDULING =====

/// Default tick period (milliseconds)
pub const DEFAULT_TICK_PERIOD_MS: u64 = 1_000;

/// Shortest accepted tick period (milliseconds)
pub const MIN_TICK_PERIOD_MS: u64 = 10;

/// Longest accepted tick period (milliseconds)
pub const MAX_TICK_PERIOD_MS: u64 = 60_000;

/// Scheduler emits a status line every N ticks
pub const DEFAULT_STATUS_LOG_INTERVAL_TICKS: u64 = 100;

// ===== PRICE PROCESS =====

/// Full width of the uniform step: u ~ U[-v/2, +v/2]
pub const DEFAULT_VOLATILITY: f64 = 0.004;

/// Probability that an instrument prints a trade on a given tick
pub const DEFAULT_TRADE_PROBABILITY: f64 = 0.3;

/// Trade sizes drawn uniformly from this range
pub const TRADE_SIZE_RANGE: (f64, f64) = (0.01, 10.0);

/// Names attached to synthetic trade prints
pub const EXECUTORS: &[&str] = &["AI Bot", "Market Maker", "Momentum Algo", "Retail", "Arbitrage Desk"];

// ===== ORDER BOOK =====

/// Levels per side
pub const DEFAULT_BOOK_DEPTH: usize = 10;

/// Half-spread as a fraction of the reference price
pub const DEFAULT_SPREAD_FRACTION: f64 = 0.0005;

/// Distance between adjacent levels as a fraction of the reference price
pub const DEFAULT_STEP_FRACTION: f64 = 0.0001;

/// Level sizes drawn uniformly from [min, max)
pub const LEVEL_SIZE_RANGE: (f64, f64) = (0.1, 5.1);

// ===== CHART =====

/// Points retained per instrument
pub const DEFAULT_CHART_CAPACITY: usize = 120;

/// Bucket width (one minute)
pub const DEFAULT_BUCKET_MS: u64 = 60_000;

/// Relative noise applied to the predicted price
pub const DEFAULT_PREDICTION_NOISE: f64 = 0.01;

/// Per-tick synthetic volume drawn uniformly from this range
pub const TICK_VOLUME_RANGE: (f64, f64) = (100.0, 5_000.0);

// ===== EVENT LOGS =====

pub const DEFAULT_TRADE_LOG_CAPACITY: usize = 50;
pub const DEFAULT_INSIGHT_LOG_CAPACITY: usize = 20;

// ===== EXTERNAL SOURCES =====

/// Poll cadence for advisory and liquidity sources (milliseconds)
pub const DEFAULT_SOURCE_POLL_MS: u64 = 3_000;

/// Per-call time box (milliseconds)
pub const DEFAULT_SOURCE_TIMEOUT_MS: u64 = 2_000;

/// Insights requested per poll
pub const DEFAULT_INSIGHT_LIMIT: usize = 5;

/// Liquidity forecast horizon (days)
pub const DEFAULT_FORECAST_HORIZON_DAYS: u32 = 30;

/// Consecutive failures before a source circuit opens
pub const DEFAULT_CIRCUIT_FAILURE_THRESHOLD: u64 = 3;

/// Time an open circuit waits before letting a trial call through (milliseconds)
pub const DEFAULT_CIRCUIT_COOLDOWN_MS: u64 = 30_000;

// ===== BUSINESS METRICS =====

/// Points retained per metric history
pub const DEFAULT_METRIC_HISTORY_CAPACITY: usize = 60;

/// Bounded relative delta applied when the liquidity feed is unavailable
pub const DEFAULT_FALLBACK_JITTER: f64 = 0.005;

/// Liquidity used until the first successful poll (USD)
pub const DEFAULT_INITIAL_LIQUIDITY: f64 = 2_500_000_000.0;
