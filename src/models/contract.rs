use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One tradeable put contract at a point in time. Constructed fresh on every
/// options-chain fetch; only surviving, scored contracts are persisted (as
/// recommendations).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionContract {
    pub symbol: String,
    pub strike: f64,
    pub expiration: NaiveDate,
    pub bid: f64,
    pub ask: f64,
    /// Bid/ask midpoint while the market is open, last-trade price otherwise.
    pub premium: f64,
    /// Signed delta; negative for puts, in [-1, 0].
    pub delta: f64,
    /// Implied volatility as a 0-1 fraction.
    pub implied_volatility: f64,
    pub volume: i64,
    pub open_interest: i64,
}

/// The unit returned by the options gateway: all put contracts for one
/// underlying, with a consistent underlying price attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionsChain {
    pub symbol: String,
    pub underlying_price: f64,
    pub options: Vec<OptionContract>,
    pub fetched_at: DateTime<Utc>,
}
