//! Deterministic replay
//!
//! Drives the tick pipeline directly with simulated timestamps, so the same
//! seed always produces byte-identical output. Snapshots are written to
//! stdout as JSON lines.

use anyhow::{bail, Result};
use clap::Parser;
use pulse_bins::common::{init_logging, print_stats, CommonArgs};
use pulse_core::engine::Pipeline;
use std::io::{BufWriter, Write};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct ReplayArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Number of ticks to run
    #[arg(short = 'n', long, default_value = "100")]
    ticks: u64,

    /// Write every Nth snapshot (the last one is always written)
    #[arg(long, default_value = "1")]
    every: u64,

    /// Simulated start time (ms since epoch)
    #[arg(long, default_value = "1700000000000")]
    start_ms: u64,

    /// Only emit this instrument's view
    #[arg(long)]
    symbol: Option<String>,
}

fn main() -> Result<()> {
    let args = ReplayArgs::parse();

    let mut config = args.common.load_config()?;
    if config.engine.rng_seed.is_none() {
        config.engine.rng_seed = Some(42);
    }
    init_logging(&config)?;

    if let Some(symbol) = &args.symbol {
        if !config.instruments.iter().any(|i| &i.symbol == symbol) {
            bail!("unknown instrument '{}'", symbol);
        }
    }

    tracing::info!("=== Pulse: Replay ===");
    tracing::info!(
        "Seed: {:?}, ticks: {}, period: {}ms",
        config.engine.rng_seed,
        args.ticks,
        config.engine.tick_period_ms
    );

    let period_ms = config.engine.tick_period_ms;
    let mut pipeline = Pipeline::new(&config)?;
    let every = args.every.max(1);

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut failures = 0usize;
    let mut last = pipeline.snapshot();

    for i in 1..=args.ticks {
        let report = pipeline.tick(args.start_ms + i * period_ms);
        failures += report.failures.len();
        last = report.snapshot;

        if i % every != 0 && i != args.ticks {
            continue;
        }

        match &args.symbol {
            Some(symbol) => {
                if let Some(view) = last.instrument(symbol) {
                    serde_json::to_writer(&mut out, view)?;
                }
            }
            None => serde_json::to_writer(&mut out, &last)?,
        }
        writeln!(out)?;
    }
    out.flush()?;

    if failures > 0 {
        tracing::warn!("{} instrument steps failed during replay", failures);
    }
    print_stats(&last, pipeline.metrics());
    Ok(())
}
