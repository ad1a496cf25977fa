//! Bounded random-walk price process
//!
//! ```text
//! u      ~ Uniform[-volatility/2, +volatility/2]
//! price' = max(price * (1 + u), MIN_PRICE)
//! high'  = max(high, price'),  low' = min(low, price')
//! change = price' - open,      change_pct = change / open * 100
//! ```
//!
//! The step is a pure function of its inputs and one RNG draw, so a seeded
//! RNG replays the exact same path.

use crate::core::{PriceState, StepError, MIN_PRICE};
use rand::{Rng, RngCore};

/// Price process plugged into the tick pipeline
pub trait PriceModel: Send {
    /// Advance `prev` by one step
    fn step(
        &mut self,
        prev: &PriceState,
        reference_open: f64,
        volatility: f64,
        rng: &mut dyn RngCore,
    ) -> Result<PriceState, StepError>;

    /// Model name for logging
    fn name(&self) -> &'static str;
}

/// Uniform bounded random walk (the default model)
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomWalk;

impl PriceModel for RandomWalk {
    #[inline]
    fn step(
        &mut self,
        prev: &PriceState,
        reference_open: f64,
        volatility: f64,
        rng: &mut dyn RngCore,
    ) -> Result<PriceState, StepError> {
        step(prev, reference_open, volatility, rng)
    }

    fn name(&self) -> &'static str {
        "random_walk"
    }
}

/// One random-walk step
pub fn step<R: RngCore + ?Sized>(
    prev: &PriceState,
    reference_open: f64,
    volatility: f64,
    rng: &mut R,
) -> Result<PriceState, StepError> {
    if !prev.price.is_finite() || prev.price <= 0.0 {
        return Err(StepError::InvalidPrice {
            symbol: prev.symbol.clone(),
            price: prev.price,
        });
    }
    if !volatility.is_finite() || volatility < 0.0 {
        return Err(StepError::InvalidVolatility {
            symbol: prev.symbol.clone(),
            volatility,
        });
    }

    let half = volatility / 2.0;
    let u = if half > 0.0 { rng.gen_range(-half..=half) } else { 0.0 };

    Ok(apply_return(prev, reference_open, u))
}

/// Apply a relative return `u` to `prev`, clamping at `MIN_PRICE`
pub fn apply_return(prev: &PriceState, reference_open: f64, u: f64) -> PriceState {
    let raw = prev.price * (1.0 + u);
    let price = if raw.is_finite() && raw > MIN_PRICE { raw } else { MIN_PRICE };

    let open = if reference_open > 0.0 { reference_open } else { prev.price };
    let change_abs = price - open;

    PriceState {
        symbol: prev.symbol.clone(),
        price,
        day_high: prev.day_high.max(price),
        day_low: prev.day_low.min(price),
        change_abs,
        change_pct: change_abs / open * 100.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Instrument;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn opening(price: f64) -> PriceState {
        PriceState::opening(&Instrument::new("TEST", "Test", "None", price))
    }

    #[test]
    fn test_step_stays_within_band() {
        let mut rng = StdRng::seed_from_u64(1);
        let prev = opening(100.0);
        for _ in 0..1_000 {
            let next = step(&prev, 100.0, 0.008, &mut rng).unwrap();
            assert!(next.price >= 100.0 * (1.0 - 0.004) - 1e-9);
            assert!(next.price <= 100.0 * (1.0 + 0.004) + 1e-9);
        }
    }

    #[test]
    fn test_step_tracks_high_low_and_change() {
        let prev = PriceState {
            symbol: "TEST".into(),
            price: 100.0,
            day_high: 101.0,
            day_low: 99.5,
            change_abs: 0.0,
            change_pct: 0.0,
        };

        let up = apply_return(&prev, 100.0, 0.02);
        assert_relative_eq!(up.price, 102.0, epsilon = 1e-9);
        assert_relative_eq!(up.day_high, 102.0, epsilon = 1e-9);
        assert_relative_eq!(up.day_low, 99.5);
        assert_relative_eq!(up.change_abs, 2.0, epsilon = 1e-9);
        assert_relative_eq!(up.change_pct, 2.0, epsilon = 1e-9);

        let down = apply_return(&prev, 100.0, -0.01);
        assert_relative_eq!(down.day_low, 99.0, epsilon = 1e-9);
        assert_relative_eq!(down.change_pct, -1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_step_clamps_to_min_price() {
        let prev = opening(1e-8);
        let next = apply_return(&prev, 1.0, -1.5);
        assert_eq!(next.price, MIN_PRICE);
        assert!(next.price > 0.0);
    }

    #[test]
    fn test_zero_volatility_is_flat() {
        let mut rng = StdRng::seed_from_u64(3);
        let prev = opening(50.0);
        let next = step(&prev, 50.0, 0.0, &mut rng).unwrap();
        assert_eq!(next.price, 50.0);
    }

    #[test]
    fn test_step_rejects_bad_inputs() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut prev = opening(50.0);
        assert!(matches!(
            step(&prev, 50.0, -0.1, &mut rng),
            Err(StepError::InvalidVolatility { .. })
        ));
        prev.price = f64::NAN;
        assert!(matches!(
            step(&prev, 50.0, 0.01, &mut rng),
            Err(StepError::InvalidPrice { .. })
        ));
    }

    #[test]
    fn test_seeded_replay_is_deterministic() {
        let run = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut model = RandomWalk;
            let mut state = opening(250.0);
            for _ in 0..100 {
                state = model.step(&state, 250.0, 0.006, &mut rng).unwrap();
            }
            state.price
        };
        assert_eq!(run(42), run(42));
        assert_ne!(run(42), run(43));
    }
}
