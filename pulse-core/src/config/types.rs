use super::constants::*;
use crate::core::{Instrument, Severity};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub book: BookConfig,
    #[serde(default)]
    pub chart: ChartConfig,
    #[serde(default)]
    pub logs: LogConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default = "default_instruments")]
    pub instruments: Vec<Instrument>,
}

/// Tick loop and price process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Tick period in milliseconds
    #[serde(default = "default_tick_period")]
    pub tick_period_ms: u64,

    /// Full width of the uniform random-walk step
    #[serde(default = "default_volatility")]
    pub volatility: f64,

    /// Probability of a trade print per instrument per tick (0.0 to 1.0)
    #[serde(default = "default_trade_probability")]
    pub trade_probability: f64,

    /// Seed for deterministic replay; entropy-seeded when absent
    #[serde(default)]
    pub rng_seed: Option<u64>,

    /// Status log cadence in ticks (0 disables)
    #[serde(default = "default_status_interval")]
    pub status_log_interval_ticks: u64,
}

/// Order book synthesis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookConfig {
    /// Levels per side
    #[serde(default = "default_depth")]
    pub depth: usize,

    /// Half-spread as a fraction of the reference price
    #[serde(default = "default_spread_fraction")]
    pub spread_fraction: f64,

    /// Level spacing as a fraction of the reference price
    #[serde(default = "default_step_fraction")]
    pub step_fraction: f64,
}

/// Chart series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    #[serde(default = "default_chart_capacity")]
    pub capacity: usize,

    /// Bucket width in milliseconds
    #[serde(default = "default_bucket_ms")]
    pub bucket_ms: u64,

    /// Relative noise on the predicted price
    #[serde(default = "default_prediction_noise")]
    pub prediction_noise: f64,
}

/// Event log capacities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_trade_capacity")]
    pub trade_capacity: usize,

    #[serde(default = "default_insight_capacity")]
    pub insight_capacity: usize,
}

/// External advisory and liquidity sources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Advisory endpoint; the local generator is used when absent
    #[serde(default)]
    pub advisory_url: Option<String>,

    /// Liquidity endpoint; the last value is perturbed when absent
    #[serde(default)]
    pub liquidity_url: Option<String>,

    #[serde(default = "default_poll_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_insight_limit")]
    pub insight_limit: usize,

    /// Only request insights at or above this severity
    #[serde(default)]
    pub severity_filter: Option<Severity>,

    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,

    #[serde(default = "default_circuit_threshold")]
    pub circuit_failure_threshold: u64,

    #[serde(default = "default_circuit_cooldown_ms")]
    pub circuit_cooldown_ms: u64,
}

impl SourcesConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Business metrics, logging and monitoring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Bounded relative delta used when the liquidity feed is unavailable
    #[serde(default = "default_fallback_jitter")]
    pub fallback_jitter: f64,

    /// Liquidity before the first successful poll (USD)
    #[serde(default = "default_initial_liquidity")]
    pub initial_liquidity: f64,

    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,

    /// Prometheus endpoint bind address (disabled when absent)
    #[serde(default)]
    pub metrics_addr: Option<String>,
}

// Default value functions
fn default_tick_period() -> u64 {
    DEFAULT_TICK_PERIOD_MS
}

fn default_volatility() -> f64 {
    DEFAULT_VOLATILITY
}

fn default_trade_probability() -> f64 {
    DEFAULT_TRADE_PROBABILITY
}

fn default_status_interval() -> u64 {
    DEFAULT_STATUS_LOG_INTERVAL_TICKS
}

fn default_depth() -> usize {
    DEFAULT_BOOK_DEPTH
}

fn default_spread_fraction() -> f64 {
    DEFAULT_SPREAD_FRACTION
}

fn default_step_fraction() -> f64 {
    DEFAULT_STEP_FRACTION
}

fn default_chart_capacity() -> usize {
    DEFAULT_CHART_CAPACITY
}

fn default_bucket_ms() -> u64 {
    DEFAULT_BUCKET_MS
}

fn default_prediction_noise() -> f64 {
    DEFAULT_PREDICTION_NOISE
}

fn default_trade_capacity() -> usize {
    DEFAULT_TRADE_LOG_CAPACITY
}

fn default_insight_capacity() -> usize {
    DEFAULT_INSIGHT_LOG_CAPACITY
}

fn default_poll_ms() -> u64 {
    DEFAULT_SOURCE_POLL_MS
}

fn default_timeout_ms() -> u64 {
    DEFAULT_SOURCE_TIMEOUT_MS
}

fn default_insight_limit() -> usize {
    DEFAULT_INSIGHT_LIMIT
}

fn default_horizon_days() -> u32 {
    DEFAULT_FORECAST_HORIZON_DAYS
}

fn default_circuit_threshold() -> u64 {
    DEFAULT_CIRCUIT_FAILURE_THRESHOLD
}

fn default_circuit_cooldown_ms() -> u64 {
    DEFAULT_CIRCUIT_COOLDOWN_MS
}

fn default_history_capacity() -> usize {
    DEFAULT_METRIC_HISTORY_CAPACITY
}

fn default_fallback_jitter() -> f64 {
    DEFAULT_FALLBACK_JITTER
}

fn default_initial_liquidity() -> f64 {
    DEFAULT_INITIAL_LIQUIDITY
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Catalog used when no instruments are configured
pub fn default_instruments() -> Vec<Instrument> {
    vec![
        Instrument::new("AAPL", "Apple Inc.", "Technology", 189.84),
        Instrument::new("MSFT", "Microsoft Corp.", "Technology", 415.26),
        Instrument::new("NVDA", "NVIDIA Corp.", "Semiconductors", 875.28),
        Instrument::new("TSLA", "Tesla Inc.", "Automotive", 248.42),
        Instrument::new("AMZN", "Amazon.com Inc.", "Consumer", 178.25),
        Instrument::new("JPM", "JPMorgan Chase & Co.", "Financials", 198.47),
        Instrument::new("BTC-USD", "Bitcoin", "Crypto", 67_432.18),
        Instrument::new("ETH-USD", "Ethereum", "Crypto", 3_521.64),
    ]
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: default_tick_period(),
            volatility: default_volatility(),
            trade_probability: default_trade_probability(),
            rng_seed: None,
            status_log_interval_ticks: default_status_interval(),
        }
    }
}

impl Default for BookConfig {
    fn default() -> Self {
        Self {
            depth: default_depth(),
            spread_fraction: default_spread_fraction(),
            step_fraction: default_step_fraction(),
        }
    }
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            capacity: default_chart_capacity(),
            bucket_ms: default_bucket_ms(),
            prediction_noise: default_prediction_noise(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            trade_capacity: default_trade_capacity(),
            insight_capacity: default_insight_capacity(),
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            advisory_url: None,
            liquidity_url: None,
            poll_interval_ms: default_poll_ms(),
            timeout_ms: default_timeout_ms(),
            insight_limit: default_insight_limit(),
            severity_filter: None,
            horizon_days: default_horizon_days(),
            circuit_failure_threshold: default_circuit_threshold(),
            circuit_cooldown_ms: default_circuit_cooldown_ms(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
            fallback_jitter: default_fallback_jitter(),
            initial_liquidity: default_initial_liquidity(),
            log_level: default_log_level(),
            json_logs: false,
            metrics_addr: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            book: BookConfig::default(),
            chart: ChartConfig::default(),
            logs: LogConfig::default(),
            sources: SourcesConfig::default(),
            metrics: MetricsConfig::default(),
            instruments: default_instruments(),
        }
    }
}
