//! Price models that misbehave for one instrument

use crate::core::{PriceState, StepError};
use crate::market::price;
use crate::market::PriceModel;
use rand::RngCore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureMode {
    Error,
    Panic,
}

/// Random walk everywhere except `symbol`, which errors or panics
#[derive(Debug, Clone)]
pub struct FailingPriceModel {
    symbol: String,
    mode: FailureMode,
}

impl FailingPriceModel {
    /// `symbol` returns a `StepError` on every step
    pub fn for_symbol(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            mode: FailureMode::Error,
        }
    }

    /// `symbol` panics on every step
    pub fn panicking(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            mode: FailureMode::Panic,
        }
    }
}

impl PriceModel for FailingPriceModel {
    fn step(
        &mut self,
        prev: &PriceState,
        reference_open: f64,
        volatility: f64,
        rng: &mut dyn RngCore,
    ) -> Result<PriceState, StepError> {
        if prev.symbol != self.symbol {
            return price::step(prev, reference_open, volatility, rng);
        }
        match self.mode {
            FailureMode::Error => Err(StepError::Model {
                symbol: prev.symbol.clone(),
                reason: "injected failure".to_string(),
            }),
            FailureMode::Panic => panic!("injected panic for {}", prev.symbol),
        }
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Deterministic model: every step multiplies the price by `1 + ret`
#[derive(Debug, Clone, Copy)]
pub struct FixedReturnModel {
    pub ret: f64,
}

impl PriceModel for FixedReturnModel {
    fn step(
        &mut self,
        prev: &PriceState,
        reference_open: f64,
        _volatility: f64,
        _rng: &mut dyn RngCore,
    ) -> Result<PriceState, StepError> {
        Ok(price::apply_return(prev, reference_open, self.ret))
    }

    fn name(&self) -> &'static str {
        "fixed_return"
    }
}
