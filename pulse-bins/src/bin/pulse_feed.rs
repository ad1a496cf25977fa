//! Live synthetic feed
//!
//! Runs the engine on its scheduler with two consumers:
//! - a pull-style ticker following one instrument
//! - a callback dashboard summarizing metrics
//!
//! Optionally exposes Prometheus metrics and polls real advisory/liquidity
//! endpoints (local fallbacks are used otherwise). Stops on Ctrl-C or after
//! `--duration-secs`.

use anyhow::Result;
use clap::Parser;
use pulse_bins::common::{init_logging, print_stats, CommonArgs};
use pulse_core::market::MetricKey;
use pulse_core::monitoring::{MetricsServer, MetricsServerConfig};
use pulse_core::Engine;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct FeedArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Instrument the ticker follows
    #[arg(long, default_value = "AAPL")]
    symbol: String,

    /// Advisory insights endpoint
    #[arg(long)]
    advisory_url: Option<String>,

    /// Liquidity forecast endpoint
    #[arg(long)]
    liquidity_url: Option<String>,

    /// Serve /metrics and /health on this address (e.g. 127.0.0.1:9100)
    #[arg(long)]
    metrics_addr: Option<SocketAddr>,

    /// Stop after this many seconds instead of waiting for Ctrl-C
    #[arg(long)]
    duration_secs: Option<u64>,

    /// Dashboard prints every N ticks
    #[arg(long, default_value = "10")]
    dashboard_every: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = FeedArgs::parse();

    let mut config = args.common.load_config()?;
    if args.advisory_url.is_some() {
        config.sources.advisory_url = args.advisory_url.clone();
    }
    if args.liquidity_url.is_some() {
        config.sources.liquidity_url = args.liquidity_url.clone();
    }

    init_logging(&config)?;

    tracing::info!("=== Pulse: Live Feed ===");
    tracing::info!("Tick period: {}ms", config.engine.tick_period_ms);
    tracing::info!("Instruments: {}", config.instruments.len());

    let metrics_addr = match args.metrics_addr {
        Some(addr) => Some(addr),
        None => config
            .metrics
            .metrics_addr
            .as_deref()
            .map(str::parse::<SocketAddr>)
            .transpose()?,
    };

    let engine = Engine::new(config)?;

    let metrics_task = metrics_addr.map(|addr| {
        let server = MetricsServer::new(
            MetricsServerConfig::new(addr),
            engine.metrics().clone(),
            engine.hub().clone(),
        );
        tokio::spawn(async move {
            if let Err(e) = server.serve().await {
                tracing::error!("Metrics server failed: {:#}", e);
            }
        })
    });

    // Pull consumer: follows one instrument
    let mut ticker = engine.subscribe("ticker");
    ticker.select_instrument(&args.symbol)?;
    let ticker_task = tokio::spawn(async move {
        while let Some(snapshot) = ticker.next().await {
            if let Some(view) = ticker.selected(&snapshot) {
                let spread = view.book.spread_bps().unwrap_or_default();
                tracing::info!(
                    tick = snapshot.tick,
                    symbol = %view.instrument.symbol,
                    price = view.price.price,
                    change_pct = view.price.change_pct,
                    spread_bps = spread,
                    stale = view.stale,
                    "Ticker"
                );
            }
        }
    });

    // Callback consumer: periodic metric summary
    let every = args.dashboard_every.max(1);
    let dashboard = engine.subscribe_fn("dashboard", move |snapshot, _| {
        if snapshot.tick % every != 0 {
            return;
        }
        let value = |key| snapshot.metric(key).map(|m| m.value).unwrap_or_default();
        tracing::info!(
            tick = snapshot.tick,
            liquidity = value(MetricKey::TotalLiquidity),
            risk = value(MetricKey::RiskScore),
            volume = value(MetricKey::TradedVolume),
            sentiment = value(MetricKey::MarketSentiment),
            trades = snapshot.trades.len(),
            insights = snapshot.insights.len(),
            "Dashboard"
        );
    })?;

    engine.start()?;
    tracing::info!("Engine started, press Ctrl-C to stop");

    match args.duration_secs {
        Some(secs) => {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(secs)) => {}
                _ = tokio::signal::ctrl_c() => {}
            }
        }
        None => tokio::signal::ctrl_c().await?,
    }

    tracing::info!("Shutting down...");
    dashboard.unsubscribe();
    engine.shutdown().await;
    ticker_task.abort();
    if let Some(task) = metrics_task {
        task.abort();
    }

    print_stats(&engine.latest_snapshot(), engine.metrics());
    Ok(())
}
