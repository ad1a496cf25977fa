//! Programmable advisory and liquidity sources

use crate::core::{now_ms, InsightCategory, InsightEvent, Severity, SourceError};
use crate::sources::{InsightRequest, InsightSource, LiquidityFigures, LiquiditySource};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Returns `count` canned insights (capped at the request limit)
#[derive(Debug, Default)]
pub struct StaticInsightSource {
    count: usize,
    calls: AtomicU64,
}

impl StaticInsightSource {
    pub fn new(count: usize) -> Self {
        Self {
            count,
            calls: AtomicU64::new(0),
        }
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InsightSource for StaticInsightSource {
    async fn fetch(&self, request: &InsightRequest) -> Result<Vec<InsightEvent>, SourceError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let stamp = now_ms();
        Ok((0..self.count.min(request.limit))
            .map(|i| InsightEvent {
                id: format!("remote-{}-{}", call, i),
                category: InsightCategory::Opportunity,
                severity: request.severity_filter.unwrap_or(Severity::Medium),
                message: "Mock advisory insight".to_string(),
                confidence: 0.75,
                related_symbol: None,
                timestamp_ms: stamp,
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "static_advisory"
    }
}

/// Always fails with a 503
#[derive(Debug, Default)]
pub struct FailingInsightSource {
    calls: AtomicU64,
}

impl FailingInsightSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls that actually reached this source
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InsightSource for FailingInsightSource {
    async fn fetch(&self, _request: &InsightRequest) -> Result<Vec<InsightEvent>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(SourceError::Status(503))
    }

    fn name(&self) -> &'static str {
        "failing_advisory"
    }
}

/// Returns fixed figures
#[derive(Debug)]
pub struct StaticLiquiditySource {
    figures: LiquidityFigures,
}

impl StaticLiquiditySource {
    pub fn new(total_liquidity: f64) -> Self {
        Self {
            figures: LiquidityFigures {
                total_liquidity,
                available_liquidity: total_liquidity * 0.4,
                utilization_pct: 60.0,
            },
        }
    }
}

#[async_trait]
impl LiquiditySource for StaticLiquiditySource {
    async fn fetch(&self, _horizon_days: u32) -> Result<LiquidityFigures, SourceError> {
        Ok(self.figures)
    }

    fn name(&self) -> &'static str {
        "static_liquidity"
    }
}

/// Always fails with a transport-level error
#[derive(Debug, Default)]
pub struct FailingLiquiditySource {
    calls: AtomicU64,
}

impl FailingLiquiditySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LiquiditySource for FailingLiquiditySource {
    async fn fetch(&self, _horizon_days: u32) -> Result<LiquidityFigures, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(SourceError::Other("connection refused".to_string()))
    }

    fn name(&self) -> &'static str {
        "failing_liquidity"
    }
}

/// Fails the first `failures` calls, then returns fixed figures
#[derive(Debug)]
pub struct FlakyLiquiditySource {
    failures: u64,
    calls: AtomicU64,
    figures: LiquidityFigures,
}

impl FlakyLiquiditySource {
    pub fn new(failures: u64, total_liquidity: f64) -> Self {
        Self {
            failures,
            calls: AtomicU64::new(0),
            figures: StaticLiquiditySource::new(total_liquidity).figures,
        }
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LiquiditySource for FlakyLiquiditySource {
    async fn fetch(&self, _horizon_days: u32) -> Result<LiquidityFigures, SourceError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(SourceError::Status(502));
        }
        Ok(self.figures)
    }

    fn name(&self) -> &'static str {
        "flaky_liquidity"
    }
}

/// Answers only after `delay`, to exercise time-boxing
#[derive(Debug)]
pub struct SlowLiquiditySource {
    delay: Duration,
}

impl SlowLiquiditySource {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl LiquiditySource for SlowLiquiditySource {
    async fn fetch(&self, _horizon_days: u32) -> Result<LiquidityFigures, SourceError> {
        tokio::time::sleep(self.delay).await;
        Ok(LiquidityFigures {
            total_liquidity: 1.0,
            available_liquidity: 1.0,
            utilization_pct: 0.0,
        })
    }

    fn name(&self) -> &'static str {
        "slow_liquidity"
    }
}
