//! Scrape endpoint for the feed
//!
//! - `GET /metrics`: Prometheus text exposition of [`EngineMetrics`]
//! - `GET /health`: JSON summary of the latest published snapshot

use super::EngineMetrics;
use crate::engine::SnapshotHub;
use anyhow::{Context, Result};
use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

#[derive(Debug, Clone)]
pub struct MetricsServerConfig {
    pub listen_addr: SocketAddr,
}

impl MetricsServerConfig {
    pub fn new(listen_addr: SocketAddr) -> Self {
        Self { listen_addr }
    }
}

/// Body of `/health`
#[derive(Debug, Serialize)]
pub struct HealthReport {
    /// "ok", or "degraded" while any instrument is stale
    pub status: &'static str,
    pub tick: u64,
    pub timestamp_ms: u64,
    pub subscribers: usize,
    pub stale_instruments: Vec<String>,
}

impl HealthReport {
    pub fn from_hub(hub: &SnapshotHub) -> Self {
        let snapshot = hub.latest();
        let stale_instruments: Vec<String> =
            snapshot.stale_symbols().map(str::to_string).collect();
        Self {
            status: if stale_instruments.is_empty() { "ok" } else { "degraded" },
            tick: snapshot.tick,
            timestamp_ms: snapshot.timestamp_ms,
            subscribers: hub.subscriber_count(),
            stale_instruments,
        }
    }
}

struct Endpoints {
    metrics: EngineMetrics,
    hub: SnapshotHub,
}

impl Endpoints {
    fn respond(&self, method: &Method, path: &str) -> Response<Full<Bytes>> {
        if method != Method::GET {
            return reply(StatusCode::METHOD_NOT_ALLOWED, "text/plain", "GET only".into());
        }
        match path {
            "/metrics" => match encode_metrics(&self.metrics) {
                Ok(body) => reply(StatusCode::OK, PROMETHEUS_CONTENT_TYPE, body),
                Err(e) => {
                    warn!(error = %e, "Metrics encoding failed");
                    reply(StatusCode::INTERNAL_SERVER_ERROR, "text/plain", format!("{:#}", e))
                }
            },
            "/health" => match serde_json::to_string(&HealthReport::from_hub(&self.hub)) {
                Ok(body) => reply(StatusCode::OK, "application/json", body),
                Err(e) => reply(StatusCode::INTERNAL_SERVER_ERROR, "text/plain", e.to_string()),
            },
            _ => {
                debug!(path, "Unknown path requested");
                reply(StatusCode::NOT_FOUND, "text/plain", "not found".into())
            }
        }
    }
}

fn reply(status: StatusCode, content_type: &'static str, body: String) -> Response<Full<Bytes>> {
    let mut resp = Response::new(Full::new(Bytes::from(body)));
    *resp.status_mut() = status;
    resp.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    resp
}

pub struct MetricsServer {
    config: MetricsServerConfig,
    endpoints: Arc<Endpoints>,
}

impl MetricsServer {
    pub fn new(config: MetricsServerConfig, metrics: EngineMetrics, hub: SnapshotHub) -> Self {
        Self {
            config,
            endpoints: Arc::new(Endpoints { metrics, hub }),
        }
    }

    /// Accept connections until the task is dropped or aborted
    pub async fn serve(self) -> Result<()> {
        let listener = TcpListener::bind(self.config.listen_addr)
            .await
            .with_context(|| format!("Failed to bind metrics server on {}", self.config.listen_addr))?;
        info!(addr = %self.config.listen_addr, "Serving /metrics and /health");

        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    warn!(error = %e, "Accept failed");
                    continue;
                }
            };

            let endpoints = Arc::clone(&self.endpoints);
            tokio::spawn(async move {
                let service = service_fn(move |req: Request<Incoming>| {
                    let resp = endpoints.respond(req.method(), req.uri().path());
                    async move { Ok::<_, hyper::Error>(resp) }
                });
                if let Err(e) = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await
                {
                    debug!(%peer, error = %e, "Connection closed with error");
                }
            });
        }
    }
}

/// Prometheus text exposition of every registered family
pub fn encode_metrics(metrics: &EngineMetrics) -> Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&metrics.registry().gather(), &mut buffer)
        .context("Failed to encode metrics")?;
    String::from_utf8(buffer).context("Metrics exposition was not UTF-8")
}
