use axum::extract::{Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;

use super::ApiResponse;
use crate::models::EarningsEvent;
use crate::AppState;

#[derive(Deserialize)]
pub struct EarningsParams {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Upcoming earnings in the requested window (the default window when both
/// bounds are absent). Degrades to an empty list rather than erroring.
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<EarningsParams>,
) -> Json<ApiResponse<Vec<EarningsEvent>>> {
    let events = state.earnings.earnings_calendar(params.from, params.to).await;
    Json(ApiResponse::ok(events))
}
