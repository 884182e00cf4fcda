use std::env;

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,

    // Vendor API keys (optional — both absent means mock mode)
    pub fmp_api_key: Option<String>,
    pub polygon_api_key: Option<String>,
    /// Force mock data sources even when keys are present.
    pub use_mock_data: bool,

    // Client-side request quotas, per minute
    pub fmp_rate_limit: usize,
    pub polygon_rate_limit: usize,

    // Cache TTLs in minutes
    pub earnings_cache_ttl_minutes: i64,
    pub stock_price_cache_ttl_minutes: i64,
    pub options_cache_ttl_minutes: i64,
    pub eps_growth_cache_ttl_minutes: i64,

    // Background refresh; 0 disables the scheduler
    pub refresh_interval_minutes: u64,

    // Engine threshold defaults (runtime-updatable via the criteria endpoint)
    pub min_delta: f64,
    pub min_premium_percentage: f64,
    pub min_pop: f64,
    pub max_pop: f64,
    pub max_symbols_to_process: usize,
    pub min_market_cap: f64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()?,

            fmp_api_key: env::var("FMP_API_KEY").ok().filter(|k| !k.is_empty()),
            polygon_api_key: env::var("POLYGON_API_KEY").ok().filter(|k| !k.is_empty()),
            use_mock_data: env_parse("USE_MOCK_DATA", false),

            fmp_rate_limit: env_parse("FMP_RATE_LIMIT", 10),
            polygon_rate_limit: env_parse("POLYGON_RATE_LIMIT", 5),

            earnings_cache_ttl_minutes: env_parse("EARNINGS_CACHE_TTL_MINUTES", 60),
            stock_price_cache_ttl_minutes: env_parse("STOCK_PRICE_CACHE_TTL_MINUTES", 5),
            options_cache_ttl_minutes: env_parse("OPTIONS_CACHE_TTL_MINUTES", 15),
            eps_growth_cache_ttl_minutes: env_parse("EPS_GROWTH_CACHE_TTL_MINUTES", 1440),

            refresh_interval_minutes: env_parse("REFRESH_INTERVAL_MINUTES", 0),

            min_delta: env_parse("MIN_DELTA", 0.2),
            min_premium_percentage: env_parse("MIN_PREMIUM_PCT", 3.5),
            min_pop: env_parse("MIN_POP", 65.0),
            max_pop: env_parse("MAX_POP", 95.0),
            max_symbols_to_process: env_parse("MAX_SYMBOLS_TO_PROCESS", 50),
            min_market_cap: env_parse("MIN_MARKET_CAP", 1_000_000_000.0),
        })
    }

    /// Returns true if both vendor API keys are configured. Without them the
    /// service runs against deterministic mock data sources.
    pub fn has_market_keys(&self) -> bool {
        self.fmp_api_key.is_some() && self.polygon_api_key.is_some()
    }

    /// Demo mode: forced via USE_MOCK_DATA, or implied by missing keys.
    pub fn is_demo_mode(&self) -> bool {
        self.use_mock_data || !self.has_market_keys()
    }
}
