use axum::extract::State;
use axum::Json;

use super::ApiResponse;
use crate::ratelimit::LimiterUsage;
use crate::AppState;

/// Current per-source rate-limiter usage, for dashboards and debugging
/// throttled runs.
pub async fn usage(State(state): State<AppState>) -> Json<ApiResponse<Vec<LimiterUsage>>> {
    let usages = vec![
        state.fmp_limiter.usage().await,
        state.polygon_limiter.usage().await,
    ];
    Json(ApiResponse::ok(usages))
}
