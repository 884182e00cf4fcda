use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};

use super::types::{
    RawCompanyProfile, RawEarningsRow, RawEpsQuarter, RawOptionSnapshot, SnapshotDetails,
    SnapshotGreeks, SnapshotLastQuote, SnapshotSession,
};
use super::{EarningsApi, OptionsApi};
use crate::errors::MarketError;

/// Simulated network latency so mock mode exercises the same suspension
/// points as live mode.
const MOCK_LATENCY: Duration = Duration::from_millis(25);

/// Demo universe with fixed prices and fundamentals. Everything derived from
/// this table is deterministic.
const DEMO_SYMBOLS: &[(&str, f64, f64, f64)] = &[
    // (symbol, price, market_cap, revenue)
    ("NVDA", 140.0, 3.4e12, 35.1e9),
    ("AVGO", 185.0, 8.6e11, 14.1e9),
    ("COST", 920.0, 4.1e11, 62.2e9),
    ("MU", 105.0, 1.2e11, 8.7e9),
    ("PLTR", 78.0, 1.8e11, 0.83e9),
];

fn demo_entry(symbol: &str) -> Option<(f64, f64, f64)> {
    DEMO_SYMBOLS
        .iter()
        .find(|(s, ..)| *s == symbol)
        .map(|&(_, price, cap, rev)| (price, cap, rev))
}

// ---------------------------------------------------------------------------
// Earnings
// ---------------------------------------------------------------------------

pub struct MockEarningsApi {
    rows: Vec<RawEarningsRow>,
    eps_history: HashMap<String, Vec<RawEpsQuarter>>,
    profiles: HashMap<String, RawCompanyProfile>,
    fail_calendar: bool,
}

impl MockEarningsApi {
    /// The canned demo calendar: each demo symbol announces a few days out.
    pub fn demo() -> Self {
        let today = Utc::now().date_naive();
        let rows = DEMO_SYMBOLS
            .iter()
            .enumerate()
            .map(|(i, &(symbol, _, cap, rev))| RawEarningsRow {
                symbol: symbol.to_string(),
                date: (today + ChronoDuration::days(3 + i as i64)).to_string(),
                eps: None,
                eps_estimated: Some(1.0 + i as f64 * 0.25),
                revenue: None,
                revenue_estimated: Some(rev),
                market_cap: Some(cap),
                time: Some(if i % 2 == 0 { "amc" } else { "bmo" }.into()),
            })
            .collect();

        let eps_history = DEMO_SYMBOLS
            .iter()
            .map(|&(symbol, _, _, _)| {
                // Eight quarters, most recent first, ~20% YoY growth.
                let quarters = (0..8)
                    .map(|q| RawEpsQuarter {
                        date: Some(
                            (today - ChronoDuration::days(91 * (q + 1) as i64)).to_string(),
                        ),
                        eps: Some(1.2 * 0.95_f64.powi(q)),
                    })
                    .collect();
                (symbol.to_string(), quarters)
            })
            .collect();

        let profiles = DEMO_SYMBOLS
            .iter()
            .map(|&(symbol, price, cap, _)| {
                (
                    symbol.to_string(),
                    RawCompanyProfile {
                        symbol: symbol.to_string(),
                        market_cap: Some(cap),
                        price: Some(price),
                    },
                )
            })
            .collect();

        Self {
            rows,
            eps_history,
            profiles,
            fail_calendar: false,
        }
    }

    /// Fixture source with explicit calendar rows (tests).
    pub fn with_rows(rows: Vec<RawEarningsRow>) -> Self {
        Self {
            rows,
            eps_history: HashMap::new(),
            profiles: HashMap::new(),
            fail_calendar: false,
        }
    }

    /// A source whose calendar fetch always fails with a rate-limit error
    /// (fallback-path tests).
    pub fn rate_limited() -> Self {
        Self {
            rows: Vec::new(),
            eps_history: HashMap::new(),
            profiles: HashMap::new(),
            fail_calendar: true,
        }
    }

    pub fn with_eps_history(mut self, symbol: &str, quarters: Vec<RawEpsQuarter>) -> Self {
        self.eps_history.insert(symbol.to_string(), quarters);
        self
    }
}

#[async_trait]
impl EarningsApi for MockEarningsApi {
    async fn earnings_calendar(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<RawEarningsRow>, MarketError> {
        tokio::time::sleep(MOCK_LATENCY).await;

        if self.fail_calendar {
            return Err(MarketError::RateLimitExceeded {
                provider: "mock-earnings",
                suggested_wait: Duration::from_secs(60),
            });
        }

        Ok(self
            .rows
            .iter()
            .filter(|row| {
                row.date
                    .parse::<NaiveDate>()
                    .map(|d| d >= from && d <= to)
                    .unwrap_or(false)
            })
            .cloned()
            .collect())
    }

    async fn historical_eps(
        &self,
        symbol: &str,
        limit: u32,
    ) -> Result<Vec<RawEpsQuarter>, MarketError> {
        tokio::time::sleep(MOCK_LATENCY).await;
        let mut quarters = self.eps_history.get(symbol).cloned().unwrap_or_default();
        quarters.truncate(limit as usize);
        Ok(quarters)
    }

    async fn company_profile(
        &self,
        symbol: &str,
    ) -> Result<Option<RawCompanyProfile>, MarketError> {
        tokio::time::sleep(MOCK_LATENCY).await;
        Ok(self.profiles.get(symbol).cloned())
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

pub struct MockOptionsApi {
    /// symbol -> (underlying price, snapshot entries)
    chains: HashMap<String, (f64, Vec<RawOptionSnapshot>)>,
}

impl MockOptionsApi {
    /// Canned chains for the demo universe: five put strikes from ~4% to ~20%
    /// below spot, expiring shortly after each symbol's demo earnings date.
    pub fn demo() -> Self {
        let today = Utc::now().date_naive();
        let chains = DEMO_SYMBOLS
            .iter()
            .enumerate()
            .map(|(i, &(symbol, price, _, _))| {
                let expiration = today + ChronoDuration::days(3 + i as i64 + 5);
                let snapshots = (0..5)
                    .map(|k| {
                        let strike = round_strike(price * (0.96 - 0.04 * k as f64));
                        let premium = (price * 0.045 * (1.0 - 0.15 * k as f64)).max(0.05);
                        put_snapshot(
                            strike,
                            expiration,
                            premium,
                            -0.18 + 0.03 * k as f64,
                            0.32 + 0.02 * k as f64,
                            400 - 50 * k as i64,
                            1500 - 200 * k as i64,
                        )
                    })
                    .collect();
                (symbol.to_string(), (price, snapshots))
            })
            .collect();

        Self { chains }
    }

    pub fn empty() -> Self {
        Self {
            chains: HashMap::new(),
        }
    }

    pub fn with_chain(
        mut self,
        symbol: &str,
        underlying_price: f64,
        snapshots: Vec<RawOptionSnapshot>,
    ) -> Self {
        self.chains
            .insert(symbol.to_string(), (underlying_price, snapshots));
        self
    }
}

#[async_trait]
impl OptionsApi for MockOptionsApi {
    async fn prev_close(&self, symbol: &str) -> Result<f64, MarketError> {
        tokio::time::sleep(MOCK_LATENCY).await;
        self.chains
            .get(symbol)
            .map(|(price, _)| *price)
            .ok_or_else(|| {
                MarketError::InvalidResponse(format!("no previous close bar for {symbol}"))
            })
    }

    async fn options_snapshot(
        &self,
        symbol: &str,
    ) -> Result<Vec<RawOptionSnapshot>, MarketError> {
        tokio::time::sleep(MOCK_LATENCY).await;
        self.chains
            .get(symbol)
            .map(|(_, snapshots)| snapshots.clone())
            .ok_or_else(|| MarketError::InvalidResponse(format!("no snapshot for {symbol}")))
    }
}

fn round_strike(raw: f64) -> f64 {
    (raw / 2.5).round() * 2.5
}

/// Build a put-contract snapshot entry in the vendor wire shape.
pub fn put_snapshot(
    strike: f64,
    expiration: NaiveDate,
    premium: f64,
    delta: f64,
    implied_volatility: f64,
    volume: i64,
    open_interest: i64,
) -> RawOptionSnapshot {
    RawOptionSnapshot {
        details: Some(SnapshotDetails {
            contract_type: Some("put".into()),
            strike_price: Some(strike),
            expiration_date: Some(expiration.to_string()),
        }),
        bid: Some(premium - 0.05),
        ask: Some(premium + 0.05),
        greeks: Some(SnapshotGreeks { delta: Some(delta) }),
        implied_volatility: Some(implied_volatility),
        session: Some(SnapshotSession {
            volume: Some(volume),
        }),
        open_interest: Some(open_interest),
        market_status: Some("open".into()),
        last_quote: Some(SnapshotLastQuote {
            price: Some(premium),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_demo_sources_are_deterministic() {
        let a = MockEarningsApi::demo();
        let b = MockEarningsApi::demo();
        let today = Utc::now().date_naive();
        let from = today - ChronoDuration::days(3);
        let to = today + ChronoDuration::days(21);

        let rows_a = a.earnings_calendar(from, to).await.unwrap();
        let rows_b = b.earnings_calendar(from, to).await.unwrap();
        assert_eq!(rows_a.len(), DEMO_SYMBOLS.len());
        assert_eq!(
            serde_json::to_value(&rows_a).unwrap(),
            serde_json::to_value(&rows_b).unwrap()
        );
    }

    #[tokio::test]
    async fn test_demo_chain_has_puts_only() {
        let options = MockOptionsApi::demo();
        let snaps = options.options_snapshot("NVDA").await.unwrap();
        assert!(!snaps.is_empty());
        for s in &snaps {
            assert_eq!(
                s.details.as_ref().unwrap().contract_type.as_deref(),
                Some("put")
            );
        }
    }

    #[tokio::test]
    async fn test_rate_limited_source_fails() {
        let api = MockEarningsApi::rate_limited();
        let today = Utc::now().date_naive();
        let err = api
            .earnings_calendar(today, today)
            .await
            .expect_err("should fail");
        assert!(err.is_rate_limited());
    }
}
