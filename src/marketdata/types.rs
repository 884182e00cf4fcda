use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Earnings API (FMP) wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEarningsRow {
    pub symbol: String,
    /// Announcement date, `YYYY-MM-DD`.
    pub date: String,
    #[serde(default)]
    pub eps: Option<f64>,
    #[serde(default, alias = "epsEstimated")]
    pub eps_estimated: Option<f64>,
    #[serde(default)]
    pub revenue: Option<f64>,
    #[serde(default, alias = "revenueEstimated")]
    pub revenue_estimated: Option<f64>,
    #[serde(default, alias = "marketCap")]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub time: Option<String>,
}

/// One quarter of historical earnings, most recent first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEpsQuarter {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub eps: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawCompanyProfile {
    pub symbol: String,
    #[serde(default, alias = "mktCap")]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub price: Option<f64>,
}

// ---------------------------------------------------------------------------
// Options API (Polygon) wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct PrevCloseResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub results: Vec<PrevCloseBar>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrevCloseBar {
    pub c: f64,
    #[serde(default)]
    pub h: Option<f64>,
    #[serde(default)]
    pub l: Option<f64>,
    #[serde(default)]
    pub o: Option<f64>,
    #[serde(default)]
    pub v: Option<f64>,
    #[serde(default)]
    pub t: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct OptionsSnapshotResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub results: Option<Vec<RawOptionSnapshot>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawOptionSnapshot {
    #[serde(default)]
    pub details: Option<SnapshotDetails>,
    #[serde(default)]
    pub bid: Option<f64>,
    #[serde(default)]
    pub ask: Option<f64>,
    #[serde(default)]
    pub greeks: Option<SnapshotGreeks>,
    #[serde(default)]
    pub implied_volatility: Option<f64>,
    #[serde(default)]
    pub session: Option<SnapshotSession>,
    #[serde(default)]
    pub open_interest: Option<i64>,
    /// "open" / "closed" / "early_trading" etc.
    #[serde(default)]
    pub market_status: Option<String>,
    #[serde(default)]
    pub last_quote: Option<SnapshotLastQuote>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotDetails {
    #[serde(default)]
    pub contract_type: Option<String>,
    #[serde(default)]
    pub strike_price: Option<f64>,
    /// `YYYY-MM-DD`
    #[serde(default)]
    pub expiration_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotGreeks {
    #[serde(default)]
    pub delta: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotSession {
    #[serde(default)]
    pub volume: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotLastQuote {
    #[serde(default)]
    pub price: Option<f64>,
}
