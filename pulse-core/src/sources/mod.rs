//! External collaborators and their fallbacks
//!
//! - `advisory`: insight source trait + HTTP JSON client
//! - `liquidity`: liquidity source trait + HTTP JSON client
//! - `fallback`: local synthetic insight generator
//!
//! Sources are only ever called from the poller task, never from the tick.

pub mod advisory;
pub mod fallback;
pub mod liquidity;

pub use advisory::{HttpInsightSource, InsightRequest, InsightSource};
pub use fallback::{FallbackInsightGenerator, MarketMove};
pub use liquidity::{HttpLiquiditySource, LiquidityFigures, LiquiditySource};
