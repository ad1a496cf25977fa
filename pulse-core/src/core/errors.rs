//! Error types for the feed engine
//!
//! Three families, matching how each failure is handled:
//! - `EngineError`: rejected at the API boundary before any state mutation
//! - `StepError`: one instrument's tick failed; isolated by the pipeline
//! - `SourceError`: an external source failed; absorbed by the fallback path

use std::time::Duration;
use thiserror::Error;

/// Configuration and API errors surfaced to callers
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("invalid configuration: {field} {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("unknown instrument '{0}'")]
    UnknownSymbol(String),

    #[error("instrument '{0}' registered twice")]
    DuplicateSymbol(String),

    #[error("tick period {period_ms}ms outside [{min_ms}, {max_ms}]ms")]
    TickPeriodOutOfRange { period_ms: u64, min_ms: u64, max_ms: u64 },

    #[error("scheduler requires a running tokio runtime")]
    NoRuntime,
}

impl EngineError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}

/// A single instrument's price step could not be computed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StepError {
    #[error("{symbol}: previous price {price} is not a positive finite number")]
    InvalidPrice { symbol: String, price: f64 },

    #[error("{symbol}: volatility {volatility} is not a non-negative finite number")]
    InvalidVolatility { symbol: String, volatility: f64 },

    #[error("{symbol}: {reason}")]
    Model { symbol: String, reason: String },
}

/// External advisory/liquidity source failure
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("circuit open, call skipped")]
    CircuitOpen,

    #[error("source not configured")]
    NotConfigured,

    #[error("{0}")]
    Other(String),
}

impl SourceError {
    /// Short label for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Status(_) => "status",
            Self::Decode(_) => "decode",
            Self::Timeout(_) => "timeout",
            Self::CircuitOpen => "circuit_open",
            Self::NotConfigured => "not_configured",
            Self::Other(_) => "other",
        }
    }
}
