use async_trait::async_trait;
use reqwest::Client;

use super::types::{OptionsSnapshotResponse, PrevCloseResponse, RawOptionSnapshot};
use super::OptionsApi;
use crate::errors::MarketError;

const POLYGON_API_BASE: &str = "https://api.polygon.io";

/// Polygon.io client: previous-close aggregates and options-chain snapshots.
#[derive(Debug, Clone)]
pub struct PolygonClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl PolygonClient {
    pub fn new(http: Client, api_key: String) -> Self {
        Self {
            http,
            base_url: POLYGON_API_BASE.into(),
            api_key,
        }
    }

    async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<reqwest::Response, MarketError> {
        let resp = self
            .http
            .get(url)
            .query(query)
            .query(&[("apiKey", self.api_key.as_str())])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(MarketError::UpstreamHttp {
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }
        Ok(resp)
    }
}

#[async_trait]
impl OptionsApi for PolygonClient {
    async fn prev_close(&self, symbol: &str) -> Result<f64, MarketError> {
        let url = format!("{}/v2/aggs/ticker/{}/prev", self.base_url, symbol);
        let resp = self.get(&url, &[("adjusted", "true")]).await?;

        let body: PrevCloseResponse = resp
            .json()
            .await
            .map_err(|e| MarketError::InvalidResponse(format!("prev close: {e}")))?;

        body.results
            .first()
            .map(|bar| bar.c)
            .ok_or_else(|| {
                MarketError::InvalidResponse(format!("no previous close bar for {symbol}"))
            })
    }

    async fn options_snapshot(
        &self,
        symbol: &str,
    ) -> Result<Vec<RawOptionSnapshot>, MarketError> {
        let url = format!("{}/v3/snapshot/options/{}", self.base_url, symbol);
        let resp = self.get(&url, &[("limit", "250")]).await?;

        let body: OptionsSnapshotResponse = resp
            .json()
            .await
            .map_err(|e| MarketError::InvalidResponse(format!("options snapshot: {e}")))?;

        Ok(body.results.unwrap_or_default())
    }
}
