//! Testing utilities and mocks for integration tests
//!
//! - Mock advisory/liquidity sources: static, failing, slow
//! - Price models that fail or panic for one instrument
//! - Config and data builders

pub mod helpers;
pub mod mock_models;
pub mod mock_sources;

pub use helpers::*;
pub use mock_models::{FailingPriceModel, FixedReturnModel};
pub use mock_sources::{
    FailingInsightSource, FailingLiquiditySource, FlakyLiquiditySource, SlowLiquiditySource, StaticInsightSource,
    StaticLiquiditySource,
};
