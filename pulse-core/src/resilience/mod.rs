//! Resilience patterns for external sources
//!
//! - Circuit breaker that short-circuits a failing source to its fallback

pub mod circuit_breaker;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
