use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use crate::cache::{keys, CacheStore};
use crate::errors::MarketError;
use crate::marketdata::types::RawOptionSnapshot;
use crate::marketdata::OptionsApi;
use crate::models::{OptionContract, OptionsChain};
use crate::ratelimit::RateLimiter;

/// Per-symbol results of a multi-chain fetch. Individual failures are
/// collected instead of aborting the whole batch.
pub struct MultiChainResult {
    pub results: HashMap<String, OptionsChain>,
    pub errors: Vec<(String, MarketError)>,
}

/// Fetches, normalizes and caches put-option chains. Unlike the earnings
/// gateway, a miss with no stale copy surfaces the error — callers must
/// handle it.
#[derive(Clone)]
pub struct OptionsGateway {
    api: Arc<dyn OptionsApi>,
    cache: CacheStore,
    limiter: RateLimiter,
    chain_ttl_minutes: i64,
    price_ttl_minutes: i64,
}

impl OptionsGateway {
    pub fn new(
        api: Arc<dyn OptionsApi>,
        cache: CacheStore,
        limiter: RateLimiter,
        chain_ttl_minutes: i64,
        price_ttl_minutes: i64,
    ) -> Self {
        Self {
            api,
            cache,
            limiter,
            chain_ttl_minutes,
            price_ttl_minutes,
        }
    }

    /// The put chain for `symbol`, optionally restricted to one expiration.
    pub async fn options_chain(
        &self,
        symbol: &str,
        expiration: Option<NaiveDate>,
    ) -> Result<OptionsChain, MarketError> {
        let key = keys::options(symbol, expiration);

        if let Some(chain) = self.cache.get::<OptionsChain>(&key).await {
            tracing::debug!(symbol, "Options chain cache hit");
            return Ok(chain);
        }

        match self.fetch_chain(symbol, expiration).await {
            Ok(chain) => {
                self.cache.set(&key, &chain, self.chain_ttl_minutes).await;
                Ok(chain)
            }
            Err(e) => {
                if let Some(stale) = self.cache.get_stale::<OptionsChain>(&key).await {
                    tracing::warn!(
                        error = %e,
                        symbol,
                        "Options fetch failed, serving stale chain"
                    );
                    Ok(stale)
                } else {
                    Err(e)
                }
            }
        }
    }

    async fn fetch_chain(
        &self,
        symbol: &str,
        expiration: Option<NaiveDate>,
    ) -> Result<OptionsChain, MarketError> {
        let underlying_price = self.underlying_price(symbol).await?;

        self.limiter.acquire().await?;
        let snapshots = self.api.options_snapshot(symbol).await?;

        let options: Vec<OptionContract> = snapshots
            .into_iter()
            .filter_map(|snap| contract_from_snapshot(symbol, snap, expiration))
            .collect();

        tracing::debug!(symbol, puts = options.len(), "Options chain fetched");

        Ok(OptionsChain {
            symbol: symbol.to_string(),
            underlying_price,
            options,
            fetched_at: Utc::now(),
        })
    }

    /// Last price of the underlying, cached with a short TTL so a multi-chain
    /// run doesn't re-fetch the same price.
    async fn underlying_price(&self, symbol: &str) -> Result<f64, MarketError> {
        let key = keys::stock_price(symbol);
        if let Some(price) = self.cache.get::<f64>(&key).await {
            return Ok(price);
        }

        self.limiter.acquire().await?;
        let price = self.api.prev_close(symbol).await?;
        self.cache.set(&key, &price, self.price_ttl_minutes).await;
        Ok(price)
    }

    /// Fetch chains for several symbols sequentially, with a gentle stagger
    /// between calls. Per-symbol failures land in `errors`.
    pub async fn multiple_chains(&self, symbols: &[String]) -> MultiChainResult {
        let mut results = HashMap::new();
        let mut errors = Vec::new();

        for (i, symbol) in symbols.iter().enumerate() {
            match self.options_chain(symbol, None).await {
                Ok(chain) => {
                    results.insert(symbol.clone(), chain);
                }
                Err(e) => {
                    tracing::warn!(error = %e, symbol, "Chain fetch failed in batch");
                    errors.push((symbol.clone(), e));
                }
            }

            if i + 1 < symbols.len() {
                super::jittered_pause(200, 400).await;
            }
        }

        MultiChainResult { results, errors }
    }
}

/// Normalize one snapshot entry into an `OptionContract`. Keeps puts only,
/// applies the optional expiration filter, and drops entries that violate
/// the contract invariants (missing delta, non-positive strike or premium).
/// Premium is the bid/ask midpoint while the market is open and both sides
/// are quoted, last-trade price otherwise.
fn contract_from_snapshot(
    symbol: &str,
    snap: RawOptionSnapshot,
    expiration_filter: Option<NaiveDate>,
) -> Option<OptionContract> {
    let details = snap.details.as_ref()?;
    if details.contract_type.as_deref() != Some("put") {
        return None;
    }

    let strike = details.strike_price?;
    if strike <= 0.0 {
        return None;
    }

    let expiration = details
        .expiration_date
        .as_deref()?
        .parse::<NaiveDate>()
        .ok()?;
    if let Some(wanted) = expiration_filter {
        if expiration != wanted {
            return None;
        }
    }

    let delta = snap.greeks.as_ref().and_then(|g| g.delta)?;

    let bid = snap.bid.unwrap_or(0.0);
    let ask = snap.ask.unwrap_or(0.0);
    let market_open = snap.market_status.as_deref() == Some("open");
    let premium = if market_open && bid > 0.0 && ask > 0.0 {
        (bid + ask) / 2.0
    } else {
        snap.last_quote.as_ref().and_then(|q| q.price).unwrap_or(0.0)
    };
    if premium <= 0.0 {
        return None;
    }

    Some(OptionContract {
        symbol: symbol.to_string(),
        strike,
        expiration,
        bid,
        ask,
        premium,
        delta,
        implied_volatility: snap.implied_volatility.unwrap_or(0.0),
        volume: snap.session.as_ref().and_then(|s| s.volume).unwrap_or(0),
        open_interest: snap.open_interest.unwrap_or(0),
    })
}
