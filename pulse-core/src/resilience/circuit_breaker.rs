//! Per-source circuit breaker
//!
//! ```text
//!   Closed ──(threshold consecutive failures)──► Open
//!     ▲                                           │ cooldown elapsed
//!     └──────(trial succeeds)── HalfOpen ◄────────┘
//!                                  │ trial fails
//!                                  └──────────► Open
//! ```
//!
//! While Open the poller skips the request and goes straight to the
//! fallback, so a dead endpoint costs nothing per poll.

use crate::config::SourcesConfig;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before opening
    pub failure_threshold: u64,
    /// Time spent Open before a trial call is allowed
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown: Duration::from_secs(30),
        }
    }
}

impl From<&SourcesConfig> for CircuitBreakerConfig {
    fn from(sources: &SourcesConfig) -> Self {
        Self {
            failure_threshold: sources.circuit_failure_threshold.max(1),
            cooldown: Duration::from_millis(sources.circuit_cooldown_ms),
        }
    }
}

#[derive(Debug)]
struct BreakerCore {
    state: CircuitState,
    failures: u64,
    opened_at: Option<Instant>,
    trips: u64,
}

impl BreakerCore {
    fn open(&mut self, source: &'static str, cooldown: Duration) {
        self.state = CircuitState::Open;
        self.opened_at = Some(Instant::now());
        self.trips += 1;
        warn!(
            source,
            failures = self.failures,
            trips = self.trips,
            "Source circuit opened, falling back for {:?}",
            cooldown
        );
    }
}

/// Clones share state
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    source: &'static str,
    config: CircuitBreakerConfig,
    core: Arc<Mutex<BreakerCore>>,
}

impl CircuitBreaker {
    pub fn new(source: &'static str, config: CircuitBreakerConfig) -> Self {
        Self {
            source,
            config,
            core: Arc::new(Mutex::new(BreakerCore {
                state: CircuitState::Closed,
                failures: 0,
                opened_at: None,
                trips: 0,
            })),
        }
    }

    /// Whether the next call may go to the source.
    ///
    /// An Open breaker whose cooldown has elapsed moves to HalfOpen here.
    pub fn is_call_permitted(&self) -> bool {
        let mut core = self.core.lock();
        if core.state != CircuitState::Open {
            return true;
        }
        let cooled = core
            .opened_at
            .map_or(true, |at| at.elapsed() >= self.config.cooldown);
        if cooled {
            core.state = CircuitState::HalfOpen;
            debug!(source = self.source, "Probing source after cooldown");
        }
        cooled
    }

    pub fn record_success(&self) {
        let mut core = self.core.lock();
        core.failures = 0;
        if core.state != CircuitState::Closed {
            core.state = CircuitState::Closed;
            core.opened_at = None;
            info!(source = self.source, "Source recovered, circuit closed");
        }
    }

    pub fn record_failure(&self) {
        let mut core = self.core.lock();
        core.failures += 1;
        let trip = match core.state {
            CircuitState::HalfOpen => true,
            CircuitState::Closed => core.failures >= self.config.failure_threshold,
            CircuitState::Open => false,
        };
        if trip {
            core.open(self.source, self.config.cooldown);
        }
    }

    pub fn state(&self) -> CircuitState {
        self.core.lock().state
    }

    pub fn consecutive_failures(&self) -> u64 {
        self.core.lock().failures
    }

    /// Times the circuit has opened since creation
    pub fn trips(&self) -> u64 {
        self.core.lock().trips
    }

    pub fn source(&self) -> &'static str {
        self.source
    }
}
