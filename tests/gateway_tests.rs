mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use sqlx::PgPool;

use putscan::cache::{keys, CacheStore};
use putscan::gateways::{EarningsGateway, OptionsGateway};
use putscan::marketdata::mock::{MockEarningsApi, MockOptionsApi};
use putscan::models::{EarningsEvent, EarningsTime, OptionContract, OptionsChain};
use putscan::ratelimit::RateLimiter;

// Gateways share the one api_cache table; serialize so each scenario owns
// its fixtures.
static DB_LOCK: tokio::sync::Mutex<()> = tokio::sync::Mutex::const_new(());

fn options_gateway(pool: &PgPool, api: MockOptionsApi) -> OptionsGateway {
    let limiter = RateLimiter::new("polygon-test", 1000, Duration::from_secs(60));
    OptionsGateway::new(Arc::new(api), CacheStore::new(pool.clone()), limiter, 15, 5)
}

fn earnings_gateway(pool: &PgPool, api: MockEarningsApi) -> EarningsGateway {
    let limiter = RateLimiter::new("fmp-test", 1000, Duration::from_secs(60));
    EarningsGateway::new(Arc::new(api), CacheStore::new(pool.clone()), limiter, 60, 1440)
}

/// Push a cached row past its soft expiry while leaving the hard expiry
/// intact, so only the stale read path can still see it.
async fn soft_expire(pool: &PgPool, key: &str) {
    sqlx::query("UPDATE api_cache SET expires_at = NOW() - interval '1 minute' WHERE cache_key = $1")
        .bind(key)
        .execute(pool)
        .await
        .unwrap();
}

fn fixture_chain(symbol: &str) -> OptionsChain {
    let expiration = Utc::now().date_naive() + ChronoDuration::days(10);
    OptionsChain {
        symbol: symbol.to_string(),
        underlying_price: 100.0,
        options: vec![OptionContract {
            symbol: symbol.to_string(),
            strike: 95.0,
            expiration,
            bid: 3.95,
            ask: 4.05,
            premium: 4.0,
            delta: -0.15,
            implied_volatility: 0.30,
            volume: 500,
            open_interest: 1000,
        }],
        fetched_at: Utc::now(),
    }
}

#[tokio::test]
async fn test_options_chain_serves_stale_copy_when_fetch_fails() {
    let _guard = DB_LOCK.lock().await;
    let pool = common::setup_test_db().await;

    let key = keys::options("ZZZT", None);
    let cache = CacheStore::new(pool.clone());
    assert!(cache.set(&key, &fixture_chain("ZZZT"), 15).await);
    soft_expire(&pool, &key).await;

    // The mock knows nothing about ZZZT, so the re-fetch fails and the
    // gateway has to fall back to the expired copy.
    let gateway = options_gateway(&pool, MockOptionsApi::empty());
    let chain = gateway
        .options_chain("ZZZT", None)
        .await
        .expect("stale copy should be served");

    assert_eq!(chain.symbol, "ZZZT");
    assert_eq!(chain.options.len(), 1);
    assert_eq!(chain.options[0].strike, 95.0);
}

#[tokio::test]
async fn test_options_chain_propagates_error_with_no_stale_copy() {
    let _guard = DB_LOCK.lock().await;
    let pool = common::setup_test_db().await;

    let gateway = options_gateway(&pool, MockOptionsApi::empty());
    assert!(gateway.options_chain("ZZZT", None).await.is_err());
}

#[tokio::test]
async fn test_earnings_calendar_serves_stale_copy_when_rate_limited() {
    let _guard = DB_LOCK.lock().await;
    let pool = common::setup_test_db().await;

    let from = Utc::now().date_naive();
    let to = from + ChronoDuration::days(10);
    let events = vec![EarningsEvent {
        symbol: "ZZZT".to_string(),
        date: from + ChronoDuration::days(5),
        eps: None,
        eps_estimated: Some(1.2),
        revenue: None,
        revenue_estimated: Some(5.0e9),
        eps_growth: 20.0,
        market_cap: 5.0e10,
        time: EarningsTime::Amc,
    }];

    let key = keys::earnings(from, to);
    let cache = CacheStore::new(pool.clone());
    assert!(cache.set(&key, &events, 60).await);
    soft_expire(&pool, &key).await;

    let gateway = earnings_gateway(&pool, MockEarningsApi::rate_limited());
    let calendar = gateway.earnings_calendar(Some(from), Some(to)).await;

    assert_eq!(calendar.len(), 1);
    assert_eq!(calendar[0].symbol, "ZZZT");
    assert!((calendar[0].eps_growth - 20.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_earnings_calendar_error_surfaces_without_stale_copy() {
    let _guard = DB_LOCK.lock().await;
    let pool = common::setup_test_db().await;

    let from = Utc::now().date_naive();
    let to = from + ChronoDuration::days(10);
    let gateway = earnings_gateway(&pool, MockEarningsApi::rate_limited());

    // The fallible surface reports the typed error; the infallible wrapper
    // degrades the same failure to an empty calendar.
    let err = gateway
        .try_earnings_calendar(Some(from), Some(to))
        .await
        .expect_err("nothing cached to fall back on");
    assert!(err.is_rate_limited());

    assert!(gateway.earnings_calendar(Some(from), Some(to)).await.is_empty());
}
