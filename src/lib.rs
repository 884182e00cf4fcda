pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod engine;
pub mod errors;
pub mod gateways;
pub mod marketdata;
pub mod metrics;
pub mod models;
pub mod pricing;
pub mod ratelimit;
pub mod services;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::engine::RecommendationEngine;
use crate::gateways::EarningsGateway;
use crate::ratelimit::RateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: AppConfig,
    pub engine: Arc<RecommendationEngine>,
    pub earnings: EarningsGateway,
    pub cache: cache::CacheStore,
    pub fmp_limiter: RateLimiter,
    pub polygon_limiter: RateLimiter,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
}
