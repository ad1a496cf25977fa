//! Common utilities for all binaries
//!
//! Shared initialization, CLI parsing, and setup code.

use anyhow::{Context, Result};
use clap::Args;
use pulse_core::engine::Snapshot;
use pulse_core::market::MetricKey;
use pulse_core::utils::init_logger;
use pulse_core::{Config, EngineMetrics};
use std::path::PathBuf;

/// Common CLI arguments for all binaries
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// TOML config file (defaults are used when omitted)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// RNG seed for a reproducible price path
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Tick period in milliseconds
    #[arg(short, long)]
    pub tick_ms: Option<u64>,

    /// Log level (overrides the config file)
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Emit JSON logs
    #[arg(long)]
    pub json_logs: bool,
}

impl CommonArgs {
    /// Load the config file (or defaults) and apply CLI overrides
    pub fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        if let Some(seed) = self.seed {
            config.engine.rng_seed = Some(seed);
        }
        if let Some(tick_ms) = self.tick_ms {
            config.engine.tick_period_ms = tick_ms;
        }
        if let Some(level) = &self.log_level {
            config.metrics.log_level = level.clone();
        }
        if self.json_logs {
            config.metrics.json_logs = true;
        }

        config.validate().context("Invalid configuration after CLI overrides")?;
        Ok(config)
    }
}

/// Initialize tracing/logging from the resolved config
pub fn init_logging(config: &Config) -> Result<()> {
    init_logger(&config.metrics.log_level, config.metrics.json_logs)
}

/// Print final statistics
pub fn print_stats(snapshot: &Snapshot, metrics: &EngineMetrics) {
    tracing::info!("=== Final Statistics ===");
    tracing::info!("Ticks published: {}", metrics.ticks_published.get());
    tracing::info!("Ticks skipped: {}", metrics.ticks_skipped.get());
    tracing::info!("Last tick: {}", snapshot.tick);
    tracing::info!("Trades in log: {}", snapshot.trades.len());
    tracing::info!("Insights in log: {}", snapshot.insights.len());

    for instrument in &snapshot.instruments {
        tracing::info!(
            "{:<8} {:>12.4} ({:+.2}%){}",
            instrument.instrument.symbol,
            instrument.price.price,
            instrument.price.change_pct,
            if instrument.stale { " [stale]" } else { "" }
        );
    }

    for key in MetricKey::ALL {
        if let Some(metric) = snapshot.metric(key) {
            tracing::info!(
                "{:<18} {:>16.2} {} (trend {:+.2}%)",
                metric.label,
                metric.value,
                metric.unit,
                metric.trend
            );
        }
    }
}
