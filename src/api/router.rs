use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        // Recommendations
        .route("/api/recommendations", get(handlers::recommendations::list))
        .route(
            "/api/recommendations/refresh",
            post(handlers::recommendations::refresh),
        )
        // Criteria
        .route(
            "/api/criteria",
            get(handlers::criteria::get).put(handlers::criteria::update),
        )
        // Earnings calendar
        .route("/api/earnings", get(handlers::earnings::list))
        // Rate-limiter usage
        .route("/api/limits", get(handlers::limits::usage));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::render))
        .merge(api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
