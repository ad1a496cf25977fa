//! Hand-off point between the source poller and the tick pipeline
//!
//! The poller posts whatever it fetched (or fell back to); the next tick
//! drains it. Neither side ever waits on the other beyond a short lock.

use crate::core::InsightEvent;
use crate::market::LiquidityInput;

#[derive(Debug, Default)]
pub struct Inbox {
    insights: Vec<InsightEvent>,
    liquidity: Option<LiquidityInput>,
}

impl Inbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue insights in arrival order
    pub fn post_insights(&mut self, insights: Vec<InsightEvent>) {
        self.insights.extend(insights);
    }

    /// Latest liquidity outcome wins
    pub fn post_liquidity(&mut self, input: LiquidityInput) {
        self.liquidity = Some(input);
    }

    /// Take everything posted since the last drain
    pub fn drain(&mut self) -> (Vec<InsightEvent>, LiquidityInput) {
        let insights = std::mem::take(&mut self.insights);
        let liquidity = self.liquidity.take().unwrap_or(LiquidityInput::Pending);
        (insights, liquidity)
    }

    pub fn is_empty(&self) -> bool {
        self.insights.is_empty() && self.liquidity.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::LiquidityFigures;

    #[test]
    fn test_drain_resets() {
        let mut inbox = Inbox::new();
        inbox.post_liquidity(LiquidityInput::Unavailable);
        inbox.post_liquidity(LiquidityInput::Fresh(LiquidityFigures {
            total_liquidity: 10.0,
            available_liquidity: 5.0,
            utilization_pct: 50.0,
        }));

        let (insights, liquidity) = inbox.drain();
        assert!(insights.is_empty());
        assert!(matches!(liquidity, LiquidityInput::Fresh(_)));

        assert!(inbox.is_empty());
        let (_, liquidity) = inbox.drain();
        assert_eq!(liquidity, LiquidityInput::Pending);
    }
}
