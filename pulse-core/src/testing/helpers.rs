//! Builders for test configs and data

use crate::config::Config;
use crate::core::{Instrument, PriceState};

/// Default config with a fixed RNG seed
pub fn seeded_config(seed: u64) -> Config {
    let mut config = Config::default();
    config.engine.rng_seed = Some(seed);
    config
}

/// Seeded config restricted to `instruments`
pub fn config_with_instruments(seed: u64, instruments: Vec<Instrument>) -> Config {
    let mut config = seeded_config(seed);
    config.instruments = instruments;
    config
}

/// Instrument with generic metadata
pub fn test_instrument(symbol: &str, baseline_price: f64) -> Instrument {
    Instrument::new(symbol, symbol, "Test", baseline_price)
}

/// Price state sitting at `price` with the given day range
pub fn price_state(symbol: &str, price: f64, low: f64, high: f64) -> PriceState {
    PriceState {
        symbol: symbol.to_string(),
        price,
        day_high: high,
        day_low: low,
        change_abs: 0.0,
        change_pct: 0.0,
    }
}
