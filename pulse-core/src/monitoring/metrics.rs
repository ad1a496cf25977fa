//! Prometheus metrics for the feed engine
//!
//! - Tick loop: published, skipped, duration
//! - Pipeline: per-instrument step failures
//! - Sources: calls and fallbacks per source
//! - Hub: live subscribers

use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};
use std::sync::Arc;
use tracing::info;

/// Central registry for all engine metrics
#[derive(Clone)]
pub struct EngineMetrics {
    registry: Arc<Registry>,
    /// Snapshots published
    pub ticks_published: IntCounter,
    /// Scheduled firings dropped because a tick overran
    pub ticks_skipped: IntCounter,
    /// Instrument steps that failed and were skipped
    pub step_failures: IntCounterVec,
    /// Tick wall time in seconds
    pub tick_duration: Histogram,
    /// External source calls by source and outcome
    pub source_calls: IntCounterVec,
    /// Fallback activations by source and reason
    pub source_fallbacks: IntCounterVec,
    /// Live snapshot subscribers
    pub subscribers: IntGauge,
}

impl EngineMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Arc::new(Registry::new());

        let ticks_published = IntCounter::with_opts(
            Opts::new("ticks_published_total", "Snapshots published by the scheduler")
                .namespace("pulse"),
        )?;
        registry.register(Box::new(ticks_published.clone()))?;

        let ticks_skipped = IntCounter::with_opts(
            Opts::new("ticks_skipped_total", "Tick firings dropped after an overrun")
                .namespace("pulse"),
        )?;
        registry.register(Box::new(ticks_skipped.clone()))?;

        let step_failures = IntCounterVec::new(
            Opts::new("step_failures_total", "Instrument price steps skipped on error")
                .namespace("pulse"),
            &["symbol"],
        )?;
        registry.register(Box::new(step_failures.clone()))?;

        let tick_duration = Histogram::with_opts(
            HistogramOpts::new("tick_duration_seconds", "Wall time of one tick pipeline run")
                .namespace("pulse")
                .buckets(vec![0.000_05, 0.000_1, 0.000_5, 0.001, 0.005, 0.01, 0.05, 0.1]),
        )?;
        registry.register(Box::new(tick_duration.clone()))?;

        let source_calls = IntCounterVec::new(
            Opts::new("source_calls_total", "External source calls").namespace("pulse"),
            &["source", "outcome"],
        )?;
        registry.register(Box::new(source_calls.clone()))?;

        let source_fallbacks = IntCounterVec::new(
            Opts::new("source_fallbacks_total", "Fallback activations per source")
                .namespace("pulse"),
            &["source", "reason"],
        )?;
        registry.register(Box::new(source_fallbacks.clone()))?;

        let subscribers = IntGauge::with_opts(
            Opts::new("subscribers", "Live snapshot subscribers").namespace("pulse"),
        )?;
        registry.register(Box::new(subscribers.clone()))?;

        info!("Prometheus metrics registry initialized");

        Ok(Self {
            registry,
            ticks_published,
            ticks_skipped,
            step_failures,
            tick_duration,
            source_calls,
            source_fallbacks,
            subscribers,
        })
    }

    /// Get the underlying Prometheus registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_fallback(&self, source: &str, reason: &str) {
        self.source_fallbacks.with_label_values(&[source, reason]).inc();
    }

    pub fn record_call(&self, source: &str, ok: bool) {
        let outcome = if ok { "ok" } else { "error" };
        self.source_calls.with_label_values(&[source, outcome]).inc();
    }
}
