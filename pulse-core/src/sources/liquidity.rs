//! Liquidity/treasury source
//!
//! `GET {url}?horizon_days=N` →
//! `{ "totalLiquidity": f64, "availableLiquidity": f64, "utilizationPct": f64 }`

use crate::core::SourceError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Aggregate figures consumed by the metrics aggregator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidityFigures {
    pub total_liquidity: f64,
    #[serde(default)]
    pub available_liquidity: f64,
    #[serde(default)]
    pub utilization_pct: f64,
}

impl LiquidityFigures {
    fn validate(self) -> Result<Self, SourceError> {
        if !self.total_liquidity.is_finite() || self.total_liquidity < 0.0 {
            return Err(SourceError::Decode(format!(
                "totalLiquidity must be a non-negative number, got {}",
                self.total_liquidity
            )));
        }
        Ok(self)
    }
}

#[async_trait]
pub trait LiquiditySource: Send + Sync {
    async fn fetch(&self, horizon_days: u32) -> Result<LiquidityFigures, SourceError>;

    fn name(&self) -> &'static str;
}

/// HTTP JSON liquidity endpoint
pub struct HttpLiquiditySource {
    client: Client,
    url: String,
}

impl HttpLiquiditySource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl LiquiditySource for HttpLiquiditySource {
    async fn fetch(&self, horizon_days: u32) -> Result<LiquidityFigures, SourceError> {
        let resp = self
            .client
            .get(&self.url)
            .query(&[("horizon_days", horizon_days)])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(SourceError::Status(resp.status().as_u16()));
        }

        let figures: LiquidityFigures = resp
            .json()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))?;
        figures.validate()
    }

    fn name(&self) -> &'static str {
        "liquidity"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_figures_parse_camel_case() {
        let f: LiquidityFigures =
            serde_json::from_str(r#"{"totalLiquidity": 1.5e9, "utilizationPct": 62.5}"#).unwrap();
        assert_eq!(f.total_liquidity, 1.5e9);
        assert_eq!(f.available_liquidity, 0.0);
        assert_eq!(f.utilization_pct, 62.5);
    }

    #[test]
    fn test_negative_total_rejected() {
        let f = LiquidityFigures {
            total_liquidity: -1.0,
            available_liquidity: 0.0,
            utilization_pct: 0.0,
        };
        assert!(matches!(f.validate(), Err(SourceError::Decode(_))));
    }
}
