use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use futures_util::future::join_all;

use crate::cache::{keys, CacheStore};
use crate::errors::MarketError;
use crate::marketdata::types::{RawCompanyProfile, RawEarningsRow, RawEpsQuarter};
use crate::marketdata::EarningsApi;
use crate::models::{is_valid_symbol, EarningsEvent, EarningsTime};
use crate::ratelimit::RateLimiter;

/// Default calendar window: a few days back for just-announced names, three
/// weeks forward for coverage beyond the current week.
const DEFAULT_PAST_DAYS: i64 = 3;
const DEFAULT_FUTURE_DAYS: i64 = 21;

/// How many quarters of history an EPS-growth lookup requests.
const EPS_HISTORY_QUARTERS: u32 = 8;

/// EPS-growth lookups are chunked so a long calendar doesn't burst through
/// the quota; lookups within a chunk fan out concurrently.
const EPS_BATCH_SIZE: usize = 5;

/// Fetches, normalizes and caches the earnings calendar. Calendar reads never
/// fail: upstream trouble degrades to a stale cached copy and finally to an
/// empty list.
#[derive(Clone)]
pub struct EarningsGateway {
    api: Arc<dyn EarningsApi>,
    cache: CacheStore,
    limiter: RateLimiter,
    calendar_ttl_minutes: i64,
    eps_ttl_minutes: i64,
}

impl EarningsGateway {
    pub fn new(
        api: Arc<dyn EarningsApi>,
        cache: CacheStore,
        limiter: RateLimiter,
        calendar_ttl_minutes: i64,
        eps_ttl_minutes: i64,
    ) -> Self {
        Self {
            api,
            cache,
            limiter,
            calendar_ttl_minutes,
            eps_ttl_minutes,
        }
    }

    /// The earnings calendar for `[from, to]`, defaulting to the extended
    /// window. Always returns an array, possibly empty.
    pub async fn earnings_calendar(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Vec<EarningsEvent> {
        self.try_earnings_calendar(from, to)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Earnings calendar unavailable, returning empty");
                Vec::new()
            })
    }

    /// Like `earnings_calendar`, but a fetch failure with no stale copy
    /// surfaces the error, so callers can tell a quiet week from a dead
    /// upstream.
    pub async fn try_earnings_calendar(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<EarningsEvent>, MarketError> {
        let today = Utc::now().date_naive();
        let from = from.unwrap_or(today - Duration::days(DEFAULT_PAST_DAYS));
        let to = to.unwrap_or(today + Duration::days(DEFAULT_FUTURE_DAYS));
        let key = keys::earnings(from, to);

        if let Some(events) = self.cache.get::<Vec<EarningsEvent>>(&key).await {
            tracing::debug!(%from, %to, count = events.len(), "Earnings calendar cache hit");
            return Ok(events);
        }

        let rows = match self.fetch_calendar(from, to).await {
            Ok(rows) => rows,
            Err(e) => {
                if let Some(stale) = self.cache.get_stale::<Vec<EarningsEvent>>(&key).await {
                    tracing::warn!(
                        error = %e,
                        %from,
                        %to,
                        "Earnings fetch failed, serving stale calendar"
                    );
                    return Ok(stale);
                }
                return Err(e);
            }
        };

        let mut events: Vec<EarningsEvent> = rows
            .into_iter()
            .filter_map(event_from_row)
            .filter(|e| is_valid_symbol(&e.symbol))
            .collect();

        self.enrich(&mut events).await;

        self.cache.set(&key, &events, self.calendar_ttl_minutes).await;
        tracing::info!(%from, %to, count = events.len(), "Earnings calendar fetched");
        Ok(events)
    }

    async fn fetch_calendar(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<RawEarningsRow>, MarketError> {
        self.limiter.acquire().await?;
        self.api.earnings_calendar(from, to).await
    }

    /// Fill in EPS growth (and missing market caps) for every distinct
    /// symbol, in fixed-size chunks with a jittered pause between chunks.
    /// One symbol's failure degrades that symbol to growth 0 without
    /// touching its siblings.
    async fn enrich(&self, events: &mut [EarningsEvent]) {
        let mut symbols: Vec<String> = events.iter().map(|e| e.symbol.clone()).collect();
        symbols.sort();
        symbols.dedup();

        let needs_cap: std::collections::HashSet<&str> = events
            .iter()
            .filter(|e| e.market_cap <= 0.0)
            .map(|e| e.symbol.as_str())
            .collect();

        let mut growth: HashMap<String, f64> = HashMap::new();
        let mut caps: HashMap<String, f64> = HashMap::new();

        let chunks: Vec<&[String]> = symbols.chunks(EPS_BATCH_SIZE).collect();
        let total = chunks.len();
        for (i, chunk) in chunks.into_iter().enumerate() {
            let needs_cap = &needs_cap;
            let lookups = chunk.iter().map(|symbol| async move {
                let g = self.eps_growth(symbol).await;
                let cap = if needs_cap.contains(symbol.as_str()) {
                    self.market_cap(symbol).await
                } else {
                    None
                };
                (symbol.clone(), g, cap)
            });

            for (symbol, g, cap) in join_all(lookups).await {
                growth.insert(symbol.clone(), g);
                if let Some(cap) = cap {
                    caps.insert(symbol, cap);
                }
            }

            if i + 1 < total {
                super::jittered_pause(2_000, 3_000).await;
            }
        }

        for event in events.iter_mut() {
            if let Some(g) = growth.get(&event.symbol) {
                event.eps_growth = *g;
            }
            if event.market_cap <= 0.0 {
                if let Some(cap) = caps.get(&event.symbol) {
                    event.market_cap = *cap;
                }
            }
        }
    }

    /// Year-over-year EPS growth for one symbol, cached with a long TTL since
    /// historical earnings rarely change. Failures degrade to 0 and the 0 is
    /// cached too, so a flaky symbol doesn't trigger repeated failing calls.
    pub async fn eps_growth(&self, symbol: &str) -> f64 {
        let key = keys::eps_growth(symbol);
        if let Some(growth) = self.cache.get::<f64>(&key).await {
            return growth;
        }

        let growth = match self.fetch_eps_growth(symbol).await {
            Ok(g) => g,
            Err(e) => {
                tracing::warn!(error = %e, symbol, "EPS growth lookup failed, defaulting to 0");
                0.0
            }
        };

        self.cache.set(&key, &growth, self.eps_ttl_minutes).await;
        growth
    }

    async fn fetch_eps_growth(&self, symbol: &str) -> Result<f64, MarketError> {
        self.limiter.acquire().await?;
        let quarters = self.api.historical_eps(symbol, EPS_HISTORY_QUARTERS).await?;
        if quarters.len() < 2 {
            return Err(MarketError::NotEnoughData(format!(
                "{} quarters of EPS history for {symbol}",
                quarters.len()
            )));
        }
        Ok(eps_growth_from_quarters(&quarters))
    }

    /// Market cap from the company-profile endpoint, cached per symbol.
    /// Best-effort: any failure is an unknown cap.
    async fn market_cap(&self, symbol: &str) -> Option<f64> {
        let key = keys::profile(symbol);
        if let Some(profile) = self.cache.get::<RawCompanyProfile>(&key).await {
            return profile.market_cap;
        }

        if let Err(e) = self.limiter.acquire().await {
            tracing::debug!(error = %e, symbol, "Skipping profile lookup");
            return None;
        }

        match self.api.company_profile(symbol).await {
            Ok(Some(profile)) => {
                self.cache.set(&key, &profile, self.eps_ttl_minutes).await;
                profile.market_cap
            }
            Ok(None) => None,
            Err(e) => {
                tracing::debug!(error = %e, symbol, "Profile lookup failed");
                None
            }
        }
    }
}

fn event_from_row(row: RawEarningsRow) -> Option<EarningsEvent> {
    let date = row.date.parse::<NaiveDate>().ok()?;
    Some(EarningsEvent {
        symbol: row.symbol,
        date,
        eps: row.eps,
        eps_estimated: row.eps_estimated,
        revenue: row.revenue,
        revenue_estimated: row.revenue_estimated,
        eps_growth: 0.0,
        market_cap: row.market_cap.unwrap_or(0.0),
        time: row
            .time
            .as_deref()
            .map(EarningsTime::from_api_str)
            .unwrap_or(EarningsTime::Unknown),
    })
}

/// YoY growth from quarterly history (most recent first): current quarter vs
/// the quarter four back. 0 when history is too short or the comparison
/// quarter is zero.
pub fn eps_growth_from_quarters(quarters: &[RawEpsQuarter]) -> f64 {
    let eps: Vec<f64> = quarters.iter().filter_map(|q| q.eps).collect();
    if eps.len() < 2 {
        return 0.0;
    }

    let current = eps[0];
    let year_ago = eps[4.min(eps.len() - 1)];
    if year_ago == 0.0 {
        return 0.0;
    }

    (current - year_ago) / year_ago.abs() * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quarters(values: &[f64]) -> Vec<RawEpsQuarter> {
        values
            .iter()
            .map(|&eps| RawEpsQuarter {
                date: None,
                eps: Some(eps),
            })
            .collect()
    }

    #[test]
    fn test_eps_growth_year_over_year() {
        // current 1.5 vs year-ago 1.0 -> +50%
        let q = quarters(&[1.5, 1.4, 1.2, 1.1, 1.0, 0.9, 0.8, 0.7]);
        assert!((eps_growth_from_quarters(&q) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_eps_growth_negative_year_ago_uses_abs() {
        // (0.5 - (-1.0)) / 1.0 * 100 = 150%
        let q = quarters(&[0.5, 0.2, 0.0, -0.5, -1.0]);
        assert!((eps_growth_from_quarters(&q) - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_eps_growth_insufficient_history() {
        assert_eq!(eps_growth_from_quarters(&quarters(&[1.5])), 0.0);
        assert_eq!(eps_growth_from_quarters(&[]), 0.0);
    }

    #[test]
    fn test_eps_growth_zero_year_ago() {
        let q = quarters(&[1.0, 0.8, 0.6, 0.4, 0.0]);
        assert_eq!(eps_growth_from_quarters(&q), 0.0);
    }

    #[test]
    fn test_eps_growth_short_history_falls_back_to_oldest() {
        // Only three quarters: compare newest against the oldest available.
        let q = quarters(&[1.2, 1.1, 1.0]);
        assert!((eps_growth_from_quarters(&q) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_event_from_row_rejects_bad_date() {
        let row = RawEarningsRow {
            symbol: "ABC".into(),
            date: "not-a-date".into(),
            eps: None,
            eps_estimated: None,
            revenue: None,
            revenue_estimated: None,
            market_cap: None,
            time: None,
        };
        assert!(event_from_row(row).is_none());
    }
}
