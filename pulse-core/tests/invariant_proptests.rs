//! Property-based tests for the market-state invariants
//!
//! - Price stays positive and inside its day range over any step sequence
//! - Synthesized books are strictly ordered with every ask above every bid
//! - Sliding windows and event logs never exceed capacity and evict oldest first

use proptest::prelude::*;
use pulse_core::core::{ChartPoint, PriceState, TimeBucket, MIN_PRICE};
use pulse_core::market::{orderbook, price, AppendOutcome, BoundedLog, SlidingWindow};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn point(bucket: u64, price: f64) -> ChartPoint {
    ChartPoint {
        bucket: TimeBucket(bucket),
        timestamp_ms: bucket * 60_000,
        price,
        volume: 1.0,
        predicted: price,
        sentiment: 0.0,
    }
}

proptest! {
    /// Property: price > 0 after any number of steps at any volatility
    #[test]
    fn prop_price_stays_positive(
        seed in any::<u64>(),
        start in 1e-6..1e6_f64,
        volatility in 0.0..2.0_f64,
        steps in 1usize..300,
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut state = PriceState {
            symbol: "X".into(),
            price: start,
            day_high: start,
            day_low: start,
            change_abs: 0.0,
            change_pct: 0.0,
        };

        for _ in 0..steps {
            state = price::step(&state, start, volatility, &mut rng).unwrap();
            prop_assert!(state.price > 0.0);
            prop_assert!(state.price >= MIN_PRICE);
            prop_assert!(state.day_low <= state.price && state.price <= state.day_high);
        }
    }

    /// Property: one step moves the price by at most volatility / 2
    #[test]
    fn prop_step_bounded(
        seed in any::<u64>(),
        start in 1.0..1e5_f64,
        volatility in 0.0..0.5_f64,
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let state = PriceState {
            symbol: "X".into(),
            price: start,
            day_high: start,
            day_low: start,
            change_abs: 0.0,
            change_pct: 0.0,
        };
        let next = price::step(&state, start, volatility, &mut rng).unwrap();
        let ret = (next.price - start) / start;
        prop_assert!(ret.abs() <= volatility / 2.0 + 1e-12);
    }

    /// Property: asks strictly decreasing, bids strictly decreasing toward the
    /// far end, best ask above best bid
    #[test]
    fn prop_book_ordering(
        seed in any::<u64>(),
        reference in 1e-3..1e6_f64,
        depth in 0usize..40,
        spread in 1e-5..0.05_f64,
        step in 1e-5..0.01_f64,
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let book = orderbook::synthesize(reference, depth, spread, step, &mut rng);

        prop_assert_eq!(book.asks.len(), depth);
        prop_assert_eq!(book.bids.len(), depth);
        prop_assert!(book.is_well_formed());

        prop_assert!(book.asks.windows(2).all(|w| w[0].price > w[1].price));
        prop_assert!(book.bids.windows(2).all(|w| w[0].price > w[1].price));
        if let (Some(ask), Some(bid)) = (book.best_ask(), book.best_bid()) {
            prop_assert!(ask.price > bid.price);
            prop_assert!(book.asks.iter().all(|a| book.bids.iter().all(|b| a.price > b.price)));
        }
        prop_assert!(book.levels().all(|l| l.size > 0.0));
    }

    /// Property: window length <= capacity, buckets strictly increasing
    #[test]
    fn prop_window_bounded(
        capacity in 1usize..50,
        deltas in prop::collection::vec(0u64..3, 1..300),
    ) {
        let mut window: SlidingWindow<ChartPoint> = SlidingWindow::new(capacity).unwrap();
        let mut bucket = 0u64;

        for (i, delta) in deltas.into_iter().enumerate() {
            bucket += delta;
            let before_first = window.first().map(|p| p.bucket);
            let outcome = window.append(point(bucket, i as f64 + 1.0));

            prop_assert!(window.len() <= capacity);
            let buckets: Vec<_> = window.iter().map(|p| p.bucket).collect();
            prop_assert!(buckets.windows(2).all(|w| w[0] < w[1]));
            prop_assert_eq!(window.last().map(|p| p.bucket), Some(TimeBucket(bucket)));

            if let AppendOutcome::Appended { evicted } = outcome {
                if evicted > 0 {
                    // Oldest element was the one removed
                    prop_assert!(window.first().map(|p| p.bucket) > before_first);
                }
            }
        }
    }

    /// Property: log length <= capacity, newest at index 0
    #[test]
    fn prop_log_bounded(
        capacity in 1usize..30,
        count in 1usize..200,
    ) {
        let mut log = BoundedLog::new(capacity).unwrap();
        for i in 0..count {
            log.push(i);
            prop_assert!(log.len() <= capacity);
            prop_assert_eq!(log.get(0), Some(&i));
        }
        let expected: Vec<usize> = (0..count).rev().take(capacity).collect();
        prop_assert_eq!(log.to_vec(), expected);
    }
}
