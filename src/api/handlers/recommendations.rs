use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use super::ApiResponse;
use crate::cache::keys;
use crate::db::recommendation_repo;
use crate::errors::AppError;
use crate::models::Recommendation;
use crate::AppState;

/// The currently active recommendation set, best first. Serves persisted
/// rows only; it never triggers a pipeline run.
pub async fn list(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Recommendation>>>, AppError> {
    let recs = recommendation_repo::get_active(&state.db).await?;
    Ok(Json(ApiResponse::ok(recs)))
}

#[derive(Deserialize)]
pub struct RefreshParams {
    #[serde(default)]
    pub force: bool,
}

/// Run the pipeline now. With `?force=true` the market-data caches are
/// cleared first so every upstream gets re-fetched; an in-flight run is
/// never cancelled — the forced run simply queues behind it.
pub async fn refresh(
    State(state): State<AppState>,
    Query(params): Query<RefreshParams>,
) -> Result<Json<ApiResponse<Vec<Recommendation>>>, AppError> {
    if params.force {
        tracing::info!("Forced refresh: clearing market-data caches");
        state.cache.clear_prefix(keys::EARNINGS_PREFIX).await;
        state.cache.clear_prefix(keys::OPTIONS_PREFIX).await;
        state.cache.clear_prefix(keys::STOCK_PRICE_PREFIX).await;
    }

    let recs = state.engine.generate().await?;
    tracing::info!(count = recs.len(), "Manual refresh complete");
    Ok(Json(ApiResponse::ok(recs)))
}
