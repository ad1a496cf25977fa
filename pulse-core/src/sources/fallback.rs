//! Local synthetic insight generator
//!
//! Used whenever the advisory source fails, times out, or its circuit is
//! open. Insights are derived from the latest price moves so they stay
//! plausible for the instruments on screen.

use super::advisory::InsightRequest;
use crate::core::{now_ms, InsightCategory, InsightEvent, Severity};
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};

/// Latest move of one instrument, as seen by the fallback generator
#[derive(Debug, Clone, PartialEq)]
pub struct MarketMove {
    pub symbol: String,
    pub change_pct: f64,
}

#[derive(Debug, Default)]
pub struct FallbackInsightGenerator {
    generated: u64,
}

impl FallbackInsightGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total insights produced so far
    pub fn generated(&self) -> u64 {
        self.generated
    }

    /// Up to `request.limit` insights about randomly chosen instruments
    ///
    /// Moves too small to reach the severity filter are left out, so a quiet
    /// market with a high filter yields nothing.
    pub fn generate<R: RngCore + ?Sized>(
        &mut self,
        request: &InsightRequest,
        moves: &[MarketMove],
        rng: &mut R,
    ) -> Vec<InsightEvent> {
        let eligible: Vec<&MarketMove> = moves
            .iter()
            .filter(|mv| {
                request
                    .severity_filter
                    .map_or(true, |min| severity_for(mv.change_pct) >= min)
            })
            .collect();
        if eligible.is_empty() || request.limit == 0 {
            return Vec::new();
        }

        let stamp = now_ms();
        let mut out = Vec::with_capacity(request.limit);

        for _ in 0..request.limit {
            let Some(mv) = eligible.choose(rng).copied() else { break };
            let severity = severity_for(mv.change_pct);

            let (category, message) = describe(mv, rng);
            self.generated += 1;

            out.push(InsightEvent {
                id: format!("local-{}", self.generated),
                category,
                severity,
                message,
                confidence: rng.gen_range(0.6..0.95),
                related_symbol: Some(mv.symbol.clone()),
                timestamp_ms: stamp,
            });
        }

        out
    }
}

/// Severity from the size of the move
pub fn severity_for(change_pct: f64) -> Severity {
    let magnitude = change_pct.abs();
    if magnitude < 0.5 {
        Severity::Low
    } else if magnitude < 1.5 {
        Severity::Medium
    } else if magnitude < 3.0 {
        Severity::High
    } else {
        Severity::Critical
    }
}

fn describe<R: RngCore + ?Sized>(mv: &MarketMove, rng: &mut R) -> (InsightCategory, String) {
    let pct = mv.change_pct;
    match rng.gen_range(0..4u8) {
        0 if pct >= 0.0 => (
            InsightCategory::Opportunity,
            format!("{} momentum building, up {:.2}% on the session", mv.symbol, pct),
        ),
        0 | 1 if pct < 0.0 => (
            InsightCategory::Risk,
            format!("{} drawdown of {:.2}% approaching intraday tolerance", mv.symbol, pct.abs()),
        ),
        2 => (
            InsightCategory::Anomaly,
            format!("Unusual order flow detected in {}", mv.symbol),
        ),
        _ => (
            InsightCategory::Trend,
            format!(
                "{} trending {} ({:+.2}%)",
                mv.symbol,
                if pct >= 0.0 { "higher" } else { "lower" },
                pct
            ),
        ),
    }
}
