use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;

use super::types::{RawCompanyProfile, RawEarningsRow, RawEpsQuarter};
use super::EarningsApi;
use crate::errors::MarketError;

const FMP_API_BASE: &str = "https://financialmodelingprep.com/api/v3";

/// Financial Modeling Prep client: earnings calendar, historical quarterly
/// EPS, and company profiles.
#[derive(Debug, Clone)]
pub struct FmpClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl FmpClient {
    pub fn new(http: Client, api_key: String) -> Self {
        Self {
            http,
            base_url: FMP_API_BASE.into(),
            api_key,
        }
    }

    async fn get_array(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<serde_json::Value, MarketError> {
        let resp = self
            .http
            .get(url)
            .query(query)
            .query(&[("apikey", self.api_key.as_str())])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(MarketError::UpstreamHttp {
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }

        let body: serde_json::Value = resp.json().await?;
        if !body.is_array() {
            return Err(MarketError::InvalidResponse(format!(
                "expected a JSON array from {url}"
            )));
        }
        Ok(body)
    }
}

#[async_trait]
impl EarningsApi for FmpClient {
    async fn earnings_calendar(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<RawEarningsRow>, MarketError> {
        let url = format!("{}/earning_calendar", self.base_url);
        let from = from.to_string();
        let to = to.to_string();
        let body = self
            .get_array(&url, &[("from", from.as_str()), ("to", to.as_str())])
            .await?;

        serde_json::from_value(body)
            .map_err(|e| MarketError::InvalidResponse(format!("earnings calendar: {e}")))
    }

    async fn historical_eps(
        &self,
        symbol: &str,
        limit: u32,
    ) -> Result<Vec<RawEpsQuarter>, MarketError> {
        let url = format!("{}/historical/earning_calendar/{}", self.base_url, symbol);
        let limit = limit.to_string();
        let body = self.get_array(&url, &[("limit", limit.as_str())]).await?;

        serde_json::from_value(body)
            .map_err(|e| MarketError::InvalidResponse(format!("historical eps: {e}")))
    }

    async fn company_profile(
        &self,
        symbol: &str,
    ) -> Result<Option<RawCompanyProfile>, MarketError> {
        let url = format!("{}/profile/{}", self.base_url, symbol);
        let body = self.get_array(&url, &[]).await?;

        // The profile endpoint wraps a single object in an array.
        let profiles: Vec<RawCompanyProfile> = serde_json::from_value(body)
            .map_err(|e| MarketError::InvalidResponse(format!("company profile: {e}")))?;
        Ok(profiles.into_iter().next())
    }
}
