use axum::extract::State;
use axum::Json;

use super::ApiResponse;
use crate::engine::{Criteria, CriteriaUpdate};
use crate::errors::AppError;
use crate::AppState;

pub async fn get(State(state): State<AppState>) -> Json<ApiResponse<Criteria>> {
    Json(ApiResponse::ok(state.engine.criteria().await))
}

/// Partial update; absent fields keep their current value. Takes effect on
/// the next pipeline run — in-flight runs finish on their own snapshot.
pub async fn update(
    State(state): State<AppState>,
    Json(body): Json<CriteriaUpdate>,
) -> Result<Json<ApiResponse<Criteria>>, AppError> {
    // Reject inconsistent bands before anything is stored.
    let candidate = state.engine.criteria().await.apply(&body);
    if candidate.min_pop > candidate.max_pop {
        return Err(AppError::BadRequest(
            "min_pop must not exceed max_pop".into(),
        ));
    }
    if candidate.min_days_to_expiry > candidate.max_days_to_expiry {
        return Err(AppError::BadRequest(
            "min_days_to_expiry must not exceed max_days_to_expiry".into(),
        ));
    }

    let next = state.engine.update_criteria(&body).await;
    Ok(Json(ApiResponse::ok(next)))
}
