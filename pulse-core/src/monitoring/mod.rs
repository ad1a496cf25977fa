//! Monitoring and observability
//!
//! Prometheus metrics for the tick loop, sources and hub, plus an optional
//! HTTP server exposing them alongside a health summary.

pub mod metrics;
pub mod server;

pub use metrics::EngineMetrics;
pub use server::{encode_metrics, HealthReport, MetricsServer, MetricsServerConfig};
