//! Synthetic depth ladder around a reference price
//!
//! ```text
//!   ask[0]  ref + spread + (N-1)*step   <- farthest
//!   ...
//!   ask[N-1] ref + spread               <- best ask
//!   ---------- reference price ----------
//!   bid[0]  ref - spread                <- best bid
//!   ...
//!   bid[N-1] ref - spread - (N-1)*step  <- farthest
//! ```
//!
//! Read top to bottom the ladder is strictly decreasing in price. The book is
//! rebuilt from scratch on every call; there is no incremental patching.

use crate::config::constants::LEVEL_SIZE_RANGE;
use crate::core::BookSide;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

/// One price level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderBookLevel {
    pub price: f64,
    pub size: f64,
    pub side: BookSide,
}

/// Two-sided synthetic book
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OrderBook {
    pub reference_price: f64,
    /// Farthest from mid first
    pub asks: Vec<OrderBookLevel>,
    /// Nearest to mid first
    pub bids: Vec<OrderBookLevel>,
}

/// Build a book of `depth` levels per side around `reference_price`
///
/// `depth == 0` yields an empty book.
pub fn synthesize<R: RngCore + ?Sized>(
    reference_price: f64,
    depth: usize,
    spread_fraction: f64,
    step_fraction: f64,
    rng: &mut R,
) -> OrderBook {
    let mut book = OrderBook {
        reference_price,
        asks: Vec::with_capacity(depth),
        bids: Vec::with_capacity(depth),
    };
    if depth == 0 {
        return book;
    }

    let spread = reference_price * spread_fraction;
    let step = reference_price * step_fraction;
    let (min_size, max_size) = LEVEL_SIZE_RANGE;

    for i in (0..depth).rev() {
        book.asks.push(OrderBookLevel {
            price: reference_price + spread + i as f64 * step,
            size: rng.gen_range(min_size..max_size),
            side: BookSide::Ask,
        });
    }
    for i in 0..depth {
        book.bids.push(OrderBookLevel {
            price: reference_price - spread - i as f64 * step,
            size: rng.gen_range(min_size..max_size),
            side: BookSide::Bid,
        });
    }

    book
}

impl OrderBook {
    pub fn is_empty(&self) -> bool {
        self.asks.is_empty() && self.bids.is_empty()
    }

    /// Levels per side
    pub fn depth(&self) -> usize {
        self.asks.len().max(self.bids.len())
    }

    /// Full ladder: asks (farthest first) then bids (nearest first)
    pub fn levels(&self) -> impl Iterator<Item = &OrderBookLevel> {
        self.asks.iter().chain(self.bids.iter())
    }

    pub fn best_ask(&self) -> Option<&OrderBookLevel> {
        self.asks.last()
    }

    pub fn best_bid(&self) -> Option<&OrderBookLevel> {
        self.bids.first()
    }

    pub fn mid_price(&self) -> Option<f64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid.price + ask.price) / 2.0),
            _ => None,
        }
    }

    /// Top-of-book spread in basis points of the mid
    pub fn spread_bps(&self) -> Option<f64> {
        let (bid, ask) = (self.best_bid()?, self.best_ask()?);
        let mid = (bid.price + ask.price) / 2.0;
        if mid > 0.0 {
            Some((ask.price - bid.price) / mid * 10_000.0)
        } else {
            None
        }
    }

    /// Total size on one side
    pub fn liquidity(&self, side: BookSide) -> f64 {
        let levels = match side {
            BookSide::Bid => &self.bids,
            BookSide::Ask => &self.asks,
        };
        levels.iter().map(|l| l.size).sum()
    }

    /// Total notional (price * size) across both sides
    pub fn notional(&self) -> f64 {
        self.levels().map(|l| l.price * l.size).sum()
    }

    /// `(bid_vol - ask_vol) / (bid_vol + ask_vol)`, in [-1, 1]; 0 when empty
    pub fn imbalance(&self) -> f64 {
        let bid = self.liquidity(BookSide::Bid);
        let ask = self.liquidity(BookSide::Ask);
        let total = bid + ask;
        if total > 0.0 {
            (bid - ask) / total
        } else {
            0.0
        }
    }

    /// Volume-weighted price of the best `max_levels` on one side
    pub fn vwap(&self, side: BookSide, max_levels: usize) -> Option<f64> {
        let levels: Box<dyn Iterator<Item = &OrderBookLevel>> = match side {
            BookSide::Bid => Box::new(self.bids.iter()),
            BookSide::Ask => Box::new(self.asks.iter().rev()),
        };

        let (value, size) = levels
            .take(max_levels)
            .fold((0.0, 0.0), |(v, s), l| (v + l.price * l.size, s + l.size));

        if size > 0.0 {
            Some(value / size)
        } else {
            None
        }
    }

    /// Ordering invariant: strictly decreasing ladder, asks above the
    /// reference, bids below, positive sizes
    pub fn is_well_formed(&self) -> bool {
        let decreasing = self
            .levels()
            .zip(self.levels().skip(1))
            .all(|(a, b)| a.price > b.price);

        decreasing
            && self.asks.iter().all(|l| l.price > self.reference_price && l.side == BookSide::Ask)
            && self.bids.iter().all(|l| l.price < self.reference_price && l.side == BookSide::Bid)
            && self.levels().all(|l| l.size > 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_reference_ladder() {
        let mut rng = StdRng::seed_from_u64(11);
        let book = synthesize(100.0, 2, 0.0005, 0.0001, &mut rng);

        assert_eq!(book.asks.len(), 2);
        assert_eq!(book.bids.len(), 2);

        // Asks farthest first
        assert_relative_eq!(book.asks[0].price, 100.06, epsilon = 1e-9);
        assert_relative_eq!(book.asks[1].price, 100.05, epsilon = 1e-9);
        // Bids nearest first
        assert_relative_eq!(book.bids[0].price, 99.95, epsilon = 1e-9);
        assert_relative_eq!(book.bids[1].price, 99.94, epsilon = 1e-9);

        assert!(book.is_well_formed());
    }

    #[test]
    fn test_zero_depth_is_empty() {
        let mut rng = StdRng::seed_from_u64(11);
        let book = synthesize(100.0, 0, 0.0005, 0.0001, &mut rng);
        assert!(book.is_empty());
        assert_eq!(book.mid_price(), None);
        assert_eq!(book.imbalance(), 0.0);
        assert!(book.is_well_formed());
    }

    #[test]
    fn test_sizes_bounded() {
        let mut rng = StdRng::seed_from_u64(5);
        let book = synthesize(67_000.0, 50, 0.0005, 0.0002, &mut rng);
        for level in book.levels() {
            assert!(level.size >= LEVEL_SIZE_RANGE.0);
            assert!(level.size < LEVEL_SIZE_RANGE.1);
        }
    }

    #[test]
    fn test_top_of_book_views() {
        let mut rng = StdRng::seed_from_u64(9);
        let book = synthesize(200.0, 3, 0.0005, 0.0001, &mut rng);

        assert_relative_eq!(book.best_ask().unwrap().price, 200.1, epsilon = 1e-9);
        assert_relative_eq!(book.best_bid().unwrap().price, 199.9, epsilon = 1e-9);
        assert_relative_eq!(book.mid_price().unwrap(), 200.0, epsilon = 1e-9);
        assert_relative_eq!(book.spread_bps().unwrap(), 10.0, epsilon = 1e-6);

        let imbalance = book.imbalance();
        assert!((-1.0..=1.0).contains(&imbalance));
    }

    #[test]
    fn test_vwap_uses_nearest_levels() {
        let book = OrderBook {
            reference_price: 100.0,
            asks: vec![
                OrderBookLevel { price: 102.0, size: 1.0, side: BookSide::Ask },
                OrderBookLevel { price: 101.0, size: 3.0, side: BookSide::Ask },
            ],
            bids: vec![
                OrderBookLevel { price: 99.0, size: 1.0, side: BookSide::Bid },
                OrderBookLevel { price: 98.0, size: 1.0, side: BookSide::Bid },
            ],
        };
        assert_relative_eq!(book.vwap(BookSide::Ask, 1).unwrap(), 101.0);
        assert_relative_eq!(book.vwap(BookSide::Ask, 2).unwrap(), 101.25);
        assert_relative_eq!(book.vwap(BookSide::Bid, 2).unwrap(), 98.5);
        assert_relative_eq!(book.imbalance(), (2.0 - 4.0) / 6.0);
    }
}
