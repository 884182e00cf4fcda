use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A scored, filtered short-put candidate — the pipeline's output unit.
/// The full set of a run is written as "the new active generation": all
/// previously active rows are deactivated and the new rows inserted in one
/// transaction, so at most one generation is ever active.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Recommendation {
    pub id: Uuid,
    pub symbol: String,
    pub strike: f64,
    pub expiration: NaiveDate,
    pub premium: f64,
    /// Composite 0-100 ranking blending volatility, liquidity, fundamentals
    /// and probability of profit.
    pub confidence_score: f64,
    /// Modeled probability (0-100) that the put expires worthless.
    pub probability_of_profit: f64,
    pub delta: f64,
    pub implied_volatility: f64,
    pub premium_percentage: f64,
    pub max_loss: f64,
    pub breakeven: f64,
    pub earnings_date: NaiveDate,
    pub volume: i64,
    pub open_interest: i64,
    pub stock_price: f64,
    pub eps_growth: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
