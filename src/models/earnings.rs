use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Time-of-day flag for an announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EarningsTime {
    /// Before market open
    Bmo,
    /// After market close
    Amc,
    Unknown,
}

impl EarningsTime {
    pub fn from_api_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "bmo" | "before market open" => EarningsTime::Bmo,
            "amc" | "after market close" => EarningsTime::Amc,
            _ => EarningsTime::Unknown,
        }
    }
}

impl fmt::Display for EarningsTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EarningsTime::Bmo => write!(f, "bmo"),
            EarningsTime::Amc => write!(f, "amc"),
            EarningsTime::Unknown => write!(f, "unknown"),
        }
    }
}

/// An upcoming or recent earnings announcement for one symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EarningsEvent {
    pub symbol: String,
    pub date: NaiveDate,
    pub eps: Option<f64>,
    pub eps_estimated: Option<f64>,
    pub revenue: Option<f64>,
    pub revenue_estimated: Option<f64>,
    /// Year-over-year EPS growth in percent; computed lazily and cached per
    /// symbol. 0.0 when history is insufficient.
    pub eps_growth: f64,
    /// Market capitalization in dollars; 0.0 when unknown.
    pub market_cap: f64,
    pub time: EarningsTime,
}
