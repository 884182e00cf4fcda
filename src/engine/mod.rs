pub mod criteria;

pub use criteria::{Criteria, CriteriaUpdate};

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, NaiveDate, Utc};
use metrics::{counter, gauge, histogram};
use sqlx::PgPool;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::db::recommendation_repo;
use crate::errors::MarketError;
use crate::gateways::{EarningsGateway, OptionsGateway};
use crate::models::{is_valid_symbol, EarningsEvent, OptionContract, OptionsChain, Recommendation};
use crate::pricing;

/// Mega-caps get a fixed prioritization bonus: their chains are reliably
/// liquid, so they are the best use of a constrained options-API budget.
const MEGA_CAP_SYMBOLS: &[&str] = &["AAPL", "MSFT", "GOOGL", "AMZN", "NVDA", "META", "TSLA"];

/// The orchestrator: pulls earnings, prioritizes symbols, pulls options
/// chains in paced batches, scores every contract, ranks the survivors and
/// swaps them in as the new active set. Every upstream failure degrades to
/// the previously persisted active set; only total failure (upstream error
/// and an unreadable fallback) propagates.
pub struct RecommendationEngine {
    earnings: EarningsGateway,
    options: OptionsGateway,
    pool: PgPool,
    criteria: RwLock<Criteria>,
    /// Serializes runs: concurrent triggers queue up instead of interleaving
    /// the generation swap.
    run_lock: Mutex<()>,
}

impl RecommendationEngine {
    pub fn new(
        earnings: EarningsGateway,
        options: OptionsGateway,
        pool: PgPool,
        criteria: Criteria,
    ) -> Arc<Self> {
        Arc::new(Self {
            earnings,
            options,
            pool,
            criteria: RwLock::new(criteria),
            run_lock: Mutex::new(()),
        })
    }

    /// Current criteria snapshot.
    pub async fn criteria(&self) -> Criteria {
        self.criteria.read().await.clone()
    }

    /// Apply a partial update, swapping in a new criteria value. In-flight
    /// runs keep the snapshot they started with.
    pub async fn update_criteria(&self, update: &CriteriaUpdate) -> Criteria {
        let mut slot = self.criteria.write().await;
        let next = slot.apply(update);
        *slot = next.clone();
        tracing::info!(?next, "Criteria updated");
        next
    }

    /// Run the full pipeline once.
    pub async fn generate(&self) -> Result<Vec<Recommendation>, MarketError> {
        let _guard = self.run_lock.lock().await;
        let criteria = self.criteria().await;
        let started = Instant::now();
        let now = Utc::now();

        counter!("pipeline_runs_total").increment(1);

        let events = match self.earnings.try_earnings_calendar(None, None).await {
            Ok(events) => events,
            Err(e) => {
                counter!("upstream_errors_total").increment(1);
                tracing::warn!(error = %e, "Earnings fetch failed, falling back to last active set");
                let previous = self.fallback().await?;
                if previous.is_empty() {
                    // Nothing upstream and nothing persisted: surface the
                    // typed error instead of an unexplained empty list.
                    return Err(e);
                }
                return Ok(previous);
            }
        };
        if events.is_empty() {
            tracing::warn!("No earnings events available, falling back to last active set");
            return self.fallback().await;
        }

        let symbols = prioritize_symbols(&events, &criteria);
        if symbols.is_empty() {
            tracing::warn!(
                events = events.len(),
                "No symbols survived prioritization, falling back"
            );
            return self.fallback().await;
        }

        tracing::info!(
            events = events.len(),
            symbols = symbols.len(),
            "Pipeline run started"
        );

        // Earliest announcement per symbol wins when a symbol appears twice.
        let mut event_by_symbol: HashMap<&str, &EarningsEvent> = HashMap::new();
        for event in &events {
            event_by_symbol
                .entry(event.symbol.as_str())
                .and_modify(|existing| {
                    if event.date < existing.date {
                        *existing = event;
                    }
                })
                .or_insert(event);
        }

        let mut candidates: Vec<Recommendation> = Vec::new();
        let batches: Vec<&[String]> = symbols.chunks(criteria.batch_size.max(1)).collect();
        let total_batches = batches.len();

        for (i, batch) in batches.into_iter().enumerate() {
            let multi = self.options.multiple_chains(batch).await;

            for (symbol, err) in &multi.errors {
                counter!("upstream_errors_total").increment(1);
                tracing::warn!(error = %err, symbol, "Skipping symbol after chain failure");
            }

            for (symbol, chain) in &multi.results {
                let Some(event) = event_by_symbol.get(symbol.as_str()) else {
                    continue;
                };
                candidates.extend(score_chain(chain, event, &criteria, now));
            }

            tracing::debug!(
                batch = i + 1,
                total = total_batches,
                candidates = candidates.len(),
                "Batch processed"
            );

            if i + 1 < total_batches {
                crate::gateways::jittered_pause(2_000, 5_000).await;
            }
        }

        candidates.sort_by(|a, b| {
            b.confidence_score
                .partial_cmp(&a.confidence_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        candidates.truncate(criteria.max_recommendations);

        if candidates.is_empty() {
            tracing::warn!("Pipeline produced no candidates, falling back");
            return self.fallback().await;
        }

        // Persist the new active generation. A failed write is logged but the
        // fresh set is still returned: staleness is preferred over emptiness,
        // and the old generation simply stays active for fallback reads.
        if let Err(e) = recommendation_repo::replace_active_set(&self.pool, &candidates).await {
            counter!("persistence_failures_total").increment(1);
            tracing::error!(error = %e, "Failed to persist new active set");
        }

        counter!("recommendations_generated_total").increment(candidates.len() as u64);
        gauge!("active_recommendations").set(candidates.len() as f64);
        histogram!("pipeline_run_seconds").record(started.elapsed().as_secs_f64());

        tracing::info!(
            count = candidates.len(),
            elapsed_s = started.elapsed().as_secs_f64(),
            "Pipeline run complete"
        );

        Ok(candidates)
    }

    /// Terminal fallback: the last persisted active set, possibly empty.
    /// Errors out only when the store itself is unreadable.
    async fn fallback(&self) -> Result<Vec<Recommendation>, MarketError> {
        counter!("pipeline_fallbacks_total").increment(1);
        recommendation_repo::get_active(&self.pool)
            .await
            .map_err(MarketError::Persistence)
    }
}

// ---------------------------------------------------------------------------
// Prioritization
// ---------------------------------------------------------------------------

/// Rank symbols so the options-API budget is spent on the best candidates:
/// log-scaled market cap and revenue, clamped EPS growth, a bonus for short
/// tickers (presumed more liquid) and a fixed mega-cap bonus. Symbols with a
/// known market cap below the floor are dropped; unknown caps pass through.
pub fn prioritize_symbols(events: &[EarningsEvent], criteria: &Criteria) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut scored: Vec<(String, f64)> = Vec::new();

    for event in events {
        if !is_valid_symbol(&event.symbol) || !seen.insert(event.symbol.as_str()) {
            continue;
        }
        if event.market_cap > 0.0 && event.market_cap < criteria.min_market_cap {
            continue;
        }

        let revenue = event
            .revenue
            .or(event.revenue_estimated)
            .unwrap_or(0.0)
            .max(1.0);

        let mut score = event.market_cap.max(1.0).log10() * 2.0
            + event.eps_growth.clamp(-50.0, 100.0) * 0.1
            + revenue.log10()
            + (6 - event.symbol.len()) as f64 * 2.0;

        if MEGA_CAP_SYMBOLS.contains(&event.symbol.as_str()) {
            score += 10.0;
        }

        scored.push((event.symbol.clone(), score));
    }

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(criteria.max_symbols_to_process);
    scored.into_iter().map(|(symbol, _)| symbol).collect()
}

// ---------------------------------------------------------------------------
// Contract filtering & scoring
// ---------------------------------------------------------------------------

/// The hard gate every contract must clear before any pricing math runs.
pub fn passes_basic_criteria(
    contract: &OptionContract,
    stock_price: f64,
    earnings_date: NaiveDate,
    criteria: &Criteria,
    now: DateTime<Utc>,
) -> bool {
    if contract.delta.abs() > criteria.min_delta {
        return false;
    }

    let premium_pct = pricing::premium_percentage(contract.premium, stock_price);
    if premium_pct < criteria.min_premium_percentage {
        return false;
    }

    let dte = pricing::days_to_expiry(contract.expiration, now);
    if dte < criteria.min_days_to_expiry || dte > criteria.max_days_to_expiry {
        return false;
    }

    // The announcement must land before expiry: the trade has to carry the
    // earnings risk it is being paid for.
    if contract.expiration <= earnings_date {
        return false;
    }

    if contract.volume < criteria.min_volume || contract.open_interest < criteria.min_open_interest
    {
        return false;
    }

    // Premium sanity: positive, and no richer than 10% of the underlying.
    contract.premium > 0.0 && contract.premium <= stock_price * 0.10
}

/// Score one chain against its earnings event, emitting a recommendation for
/// every contract that clears the basic gate and the POP band.
pub fn score_chain(
    chain: &OptionsChain,
    event: &EarningsEvent,
    criteria: &Criteria,
    now: DateTime<Utc>,
) -> Vec<Recommendation> {
    let mut out = Vec::new();

    for contract in &chain.options {
        if !passes_basic_criteria(contract, chain.underlying_price, event.date, criteria, now) {
            continue;
        }

        let t = pricing::time_to_expiry(contract.expiration, now);
        let pop = pricing::probability_of_profit(
            chain.underlying_price,
            contract.strike,
            t,
            criteria.risk_free_rate,
            contract.implied_volatility,
        );
        if pop < criteria.min_pop || pop > criteria.max_pop {
            continue;
        }

        let premium_pct = pricing::premium_percentage(contract.premium, chain.underlying_price);
        let confidence = pricing::confidence_score(
            contract.implied_volatility,
            contract.open_interest,
            contract.volume,
            event.eps_growth,
            pop,
            premium_pct,
        );

        out.push(Recommendation {
            id: Uuid::new_v4(),
            symbol: contract.symbol.clone(),
            strike: contract.strike,
            expiration: contract.expiration,
            premium: contract.premium,
            confidence_score: confidence,
            probability_of_profit: pop,
            delta: contract.delta,
            implied_volatility: contract.implied_volatility,
            premium_percentage: premium_pct,
            max_loss: pricing::max_loss(contract.strike, contract.premium),
            breakeven: pricing::breakeven(contract.strike, contract.premium),
            earnings_date: event.date,
            volume: contract.volume,
            open_interest: contract.open_interest,
            stock_price: chain.underlying_price,
            eps_growth: event.eps_growth,
            is_active: true,
            created_at: now,
        });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EarningsTime;
    use chrono::Duration;

    fn contract(days_out: i64, now: DateTime<Utc>) -> OptionContract {
        OptionContract {
            symbol: "ABC".into(),
            strike: 95.0,
            expiration: (now + Duration::days(days_out)).date_naive(),
            bid: 3.95,
            ask: 4.05,
            premium: 4.0,
            delta: -0.15,
            implied_volatility: 0.30,
            volume: 500,
            open_interest: 1000,
        }
    }

    fn event(symbol: &str, days_out: i64, now: DateTime<Utc>) -> EarningsEvent {
        EarningsEvent {
            symbol: symbol.into(),
            date: (now + Duration::days(days_out)).date_naive(),
            eps: None,
            eps_estimated: Some(1.2),
            revenue: None,
            revenue_estimated: Some(5.0e9),
            eps_growth: 12.0,
            market_cap: 5.0e10,
            time: EarningsTime::Amc,
        }
    }

    #[test]
    fn test_basic_criteria_ideal_contract_passes() {
        let now = Utc::now();
        let c = contract(8, now);
        assert!(passes_basic_criteria(
            &c,
            100.0,
            event("ABC", 5, now).date,
            &Criteria::default(),
            now
        ));
    }

    #[test]
    fn test_basic_criteria_rejects_high_delta() {
        let now = Utc::now();
        let mut c = contract(8, now);
        c.delta = -0.25; // magnitude above the 0.2 default
        assert!(!passes_basic_criteria(
            &c,
            100.0,
            event("ABC", 5, now).date,
            &Criteria::default(),
            now
        ));
    }

    #[test]
    fn test_basic_criteria_rejects_expiry_before_earnings() {
        let now = Utc::now();
        let c = contract(8, now);
        // Earnings after expiry: the contract carries no event risk.
        let late_earnings = event("ABC", 12, now);
        assert!(!passes_basic_criteria(
            &c,
            100.0,
            late_earnings.date,
            &Criteria::default(),
            now
        ));
    }

    #[test]
    fn test_basic_criteria_rejects_rich_premium() {
        let now = Utc::now();
        let mut c = contract(8, now);
        c.premium = 11.0; // > 10% of a $100 underlying
        assert!(!passes_basic_criteria(
            &c,
            100.0,
            event("ABC", 5, now).date,
            &Criteria::default(),
            now
        ));
    }

    #[test]
    fn test_basic_criteria_rejects_illiquid() {
        let now = Utc::now();
        let earnings_date = event("ABC", 5, now).date;

        let mut thin_volume = contract(8, now);
        thin_volume.volume = 5;
        assert!(!passes_basic_criteria(
            &thin_volume,
            100.0,
            earnings_date,
            &Criteria::default(),
            now
        ));

        let mut thin_oi = contract(8, now);
        thin_oi.open_interest = 10;
        assert!(!passes_basic_criteria(
            &thin_oi,
            100.0,
            earnings_date,
            &Criteria::default(),
            now
        ));
    }

    #[test]
    fn test_score_chain_emits_expected_recommendation() {
        let now = Utc::now();
        let c = contract(8, now);
        let chain = OptionsChain {
            symbol: "ABC".into(),
            underlying_price: 100.0,
            options: vec![c.clone()],
            fetched_at: now,
        };
        let ev = event("ABC", 5, now);

        let recs = score_chain(&chain, &ev, &Criteria::default(), now);
        assert_eq!(recs.len(), 1);

        let rec = &recs[0];
        assert_eq!(rec.symbol, "ABC");
        assert!((rec.premium_percentage - 4.0).abs() < 1e-9);
        assert!((rec.breakeven - 91.0).abs() < 1e-9);
        assert!((rec.max_loss - 9100.0).abs() < 1e-9);

        // POP must match the documented Black-Scholes formula against the
        // reference CDF to 4 decimal places.
        let t = pricing::time_to_expiry(c.expiration, now);
        let expected_pop =
            pricing::norm_cdf(((100.0_f64 / 95.0).ln() + (0.05 - 0.5 * 0.30 * 0.30) * t)
                / (0.30 * t.sqrt()))
                * 100.0;
        assert!((rec.probability_of_profit - expected_pop).abs() < 1e-4);
        assert!((0.0..=100.0).contains(&rec.confidence_score));
        assert!(rec.is_active);
    }

    #[test]
    fn test_score_chain_respects_pop_band() {
        let now = Utc::now();
        let chain = OptionsChain {
            symbol: "ABC".into(),
            underlying_price: 100.0,
            options: vec![contract(8, now)],
            fetched_at: now,
        };
        let ev = event("ABC", 5, now);

        // Band the real POP can't reach.
        let criteria = Criteria {
            min_pop: 99.5,
            max_pop: 100.0,
            ..Criteria::default()
        };
        assert!(score_chain(&chain, &ev, &criteria, now).is_empty());
    }

    #[test]
    fn test_prioritize_filters_and_ranks() {
        let now = Utc::now();
        let criteria = Criteria {
            min_market_cap: 1.0e9,
            max_symbols_to_process: 3,
            ..Criteria::default()
        };

        let mut tiny = event("TINY", 5, now);
        tiny.market_cap = 5.0e8; // below the floor

        let mut unknown = event("UNKWN", 5, now);
        unknown.market_cap = 0.0; // unknown cap passes

        let mut nvda = event("NVDA", 5, now);
        nvda.market_cap = 3.0e12;

        let mid = event("ABC", 6, now);
        let other = event("XYZDE", 7, now);

        let symbols = prioritize_symbols(&[tiny, unknown, nvda.clone(), mid, other], &criteria);

        assert_eq!(symbols.len(), 3, "truncated to max_symbols_to_process");
        assert!(!symbols.contains(&"TINY".to_string()));
        assert_eq!(symbols[0], "NVDA", "mega-cap bonus should rank NVDA first");
    }

    #[test]
    fn test_prioritize_dedupes_symbols() {
        let now = Utc::now();
        let events = vec![event("ABC", 5, now), event("ABC", 40, now)];
        let symbols = prioritize_symbols(&events, &Criteria::default());
        assert_eq!(symbols, vec!["ABC".to_string()]);
    }
}
