use std::sync::Arc;
use std::time::Duration;

use putscan::api::router::create_router;
use putscan::cache::CacheStore;
use putscan::config::AppConfig;
use putscan::engine::{Criteria, RecommendationEngine};
use putscan::gateways::{EarningsGateway, OptionsGateway};
use putscan::marketdata::{
    EarningsApi, FmpClient, MockEarningsApi, MockOptionsApi, OptionsApi, PolygonClient,
};
use putscan::ratelimit::RateLimiter;
use putscan::{db, metrics, services, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    let addr = format!("{}:{}", config.host, config.port);

    tracing::info!("Connecting to database...");
    let pool = db::init_pool(&config.database_url).await?;
    tracing::info!("Database connected");

    let metrics_handle = metrics::init_metrics();

    let cache = CacheStore::new(pool.clone());
    let fmp_limiter = RateLimiter::new("fmp", config.fmp_rate_limit, Duration::from_secs(60));
    let polygon_limiter =
        RateLimiter::new("polygon", config.polygon_rate_limit, Duration::from_secs(60));

    // --- Data sources: live clients with keys, deterministic mocks without ---
    let (earnings_api, options_api): (Arc<dyn EarningsApi>, Arc<dyn OptionsApi>) =
        if !config.is_demo_mode() {
            // Bounded per-call timeout so a stalled upstream can't wedge a run.
            let http = reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()?;
            tracing::info!("Market API keys present — using live data sources");
            (
                Arc::new(FmpClient::new(
                    http.clone(),
                    config.fmp_api_key.clone().unwrap_or_default(),
                )),
                Arc::new(PolygonClient::new(
                    http,
                    config.polygon_api_key.clone().unwrap_or_default(),
                )),
            )
        } else {
            tracing::warn!("Running in demo mode with mock data sources");
            (
                Arc::new(MockEarningsApi::demo()),
                Arc::new(MockOptionsApi::demo()),
            )
        };

    let earnings = EarningsGateway::new(
        earnings_api,
        cache.clone(),
        fmp_limiter.clone(),
        config.earnings_cache_ttl_minutes,
        config.eps_growth_cache_ttl_minutes,
    );
    let options = OptionsGateway::new(
        options_api,
        cache.clone(),
        polygon_limiter.clone(),
        config.options_cache_ttl_minutes,
        config.stock_price_cache_ttl_minutes,
    );

    let engine = RecommendationEngine::new(
        earnings.clone(),
        options,
        pool.clone(),
        Criteria::from_config(&config),
    );

    // --- Background refresh ---
    if config.refresh_interval_minutes > 0 {
        let scheduler_engine = engine.clone();
        let scheduler_pool = pool.clone();
        let interval = config.refresh_interval_minutes;
        tokio::spawn(async move {
            services::scheduler::run_refresh_scheduler(scheduler_engine, scheduler_pool, interval)
                .await;
        });
    } else {
        tracing::info!("Scheduler disabled (REFRESH_INTERVAL_MINUTES=0)");
    }

    let state = AppState {
        db: pool,
        config,
        engine,
        earnings,
        cache,
        fmp_limiter,
        polygon_limiter,
        metrics_handle,
    };
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {addr}");
    axum::serve(listener, router).await?;

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();
}
