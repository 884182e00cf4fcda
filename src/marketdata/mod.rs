pub mod fmp_client;
pub mod mock;
pub mod polygon_client;
pub mod types;

pub use fmp_client::FmpClient;
pub use mock::{MockEarningsApi, MockOptionsApi};
pub use polygon_client::PolygonClient;
pub use types::{RawCompanyProfile, RawEarningsRow, RawEpsQuarter, RawOptionSnapshot};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::MarketError;

/// The only path to earnings data. Gateways hold this as a trait object so
/// the live HTTP client and the canned mock source share identical control
/// flow downstream.
#[async_trait]
pub trait EarningsApi: Send + Sync {
    async fn earnings_calendar(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<RawEarningsRow>, MarketError>;

    /// Quarterly EPS history, most recent first, up to `limit` rows.
    async fn historical_eps(
        &self,
        symbol: &str,
        limit: u32,
    ) -> Result<Vec<RawEpsQuarter>, MarketError>;

    async fn company_profile(
        &self,
        symbol: &str,
    ) -> Result<Option<RawCompanyProfile>, MarketError>;
}

/// The only path to options and price data.
#[async_trait]
pub trait OptionsApi: Send + Sync {
    /// Previous session close for the underlying.
    async fn prev_close(&self, symbol: &str) -> Result<f64, MarketError>;

    /// Full options snapshot for the underlying (all contract types).
    async fn options_snapshot(
        &self,
        symbol: &str,
    ) -> Result<Vec<RawOptionSnapshot>, MarketError>;
}
