//! Advisory (insight) source
//!
//! The external service is a JSON endpoint:
//! `GET {url}?limit=N[&severity=high]` → `{ "data": [InsightEvent, ...] }`.

use crate::core::{now_ms, InsightEvent, Severity, SourceError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Insight request parameters
#[derive(Debug, Clone, PartialEq)]
pub struct InsightRequest {
    pub limit: usize,
    pub severity_filter: Option<Severity>,
}

#[async_trait]
pub trait InsightSource: Send + Sync {
    async fn fetch(&self, request: &InsightRequest) -> Result<Vec<InsightEvent>, SourceError>;

    fn name(&self) -> &'static str;
}

#[derive(Debug, Deserialize)]
struct InsightResponse {
    data: Vec<InsightEvent>,
}

/// HTTP JSON advisory endpoint
pub struct HttpInsightSource {
    client: Client,
    url: String,
}

impl HttpInsightSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl InsightSource for HttpInsightSource {
    async fn fetch(&self, request: &InsightRequest) -> Result<Vec<InsightEvent>, SourceError> {
        let mut query = vec![("limit", request.limit.to_string())];
        if let Some(severity) = request.severity_filter {
            query.push(("severity", severity.as_str().to_string()));
        }

        let resp = self.client.get(&self.url).query(&query).send().await?;
        if !resp.status().is_success() {
            return Err(SourceError::Status(resp.status().as_u16()));
        }

        let body: InsightResponse = resp
            .json()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))?;

        debug!(count = body.data.len(), url = %self.url, "Advisory insights received");
        Ok(normalize(body.data, request))
    }

    fn name(&self) -> &'static str {
        "advisory"
    }
}

/// Clamp confidences, stamp missing timestamps, apply the severity filter
/// and limit, whatever the service sent back
pub fn normalize(insights: Vec<InsightEvent>, request: &InsightRequest) -> Vec<InsightEvent> {
    let stamp = now_ms();
    insights
        .into_iter()
        .filter(|i| request.severity_filter.map_or(true, |min| i.severity >= min))
        .take(request.limit)
        .map(|mut i| {
            i.confidence = if i.confidence.is_finite() {
                i.confidence.clamp(0.0, 1.0)
            } else {
                0.0
            };
            if i.timestamp_ms == 0 {
                i.timestamp_ms = stamp;
            }
            i
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::InsightCategory;

    fn insight(id: &str, severity: Severity, confidence: f64) -> InsightEvent {
        InsightEvent {
            id: id.to_string(),
            category: InsightCategory::Trend,
            severity,
            message: "test".to_string(),
            confidence,
            related_symbol: None,
            timestamp_ms: 0,
        }
    }

    #[test]
    fn test_normalize_filters_and_clamps() {
        let request = InsightRequest {
            limit: 2,
            severity_filter: Some(Severity::Medium),
        };
        let out = normalize(
            vec![
                insight("a", Severity::Low, 0.5),
                insight("b", Severity::High, 1.7),
                insight("c", Severity::Medium, f64::NAN),
                insight("d", Severity::Critical, 0.9),
            ],
            &request,
        );

        let ids: Vec<_> = out.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
        assert_eq!(out[0].confidence, 1.0);
        assert_eq!(out[1].confidence, 0.0);
        assert!(out.iter().all(|i| i.timestamp_ms > 0));
    }

    #[test]
    fn test_response_shape() {
        let body = r#"{"data":[{"id":"x","category":"opportunity","severity":"low","message":"m","confidence":0.4}]}"#;
        let parsed: InsightResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.data.len(), 1);
        assert_eq!(parsed.data[0].category, InsightCategory::Opportunity);
    }
}
