use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tokio::time::sleep;

use crate::db::recommendation_repo;
use crate::engine::RecommendationEngine;

/// Keep deactivated generations around this long for post-mortems.
const PRUNE_KEEP_DAYS: i64 = 7;

/// Background refresh loop: run the pipeline every `interval_minutes`, then
/// prune old deactivated rows. Manual refreshes through the API queue behind
/// a scheduled run on the engine's run lock rather than interleaving.
pub async fn run_refresh_scheduler(
    engine: Arc<RecommendationEngine>,
    pool: PgPool,
    interval_minutes: u64,
) {
    tracing::info!(interval_minutes, "Refresh scheduler started");

    loop {
        sleep(Duration::from_secs(interval_minutes * 60)).await;

        match engine.generate().await {
            Ok(recs) => {
                tracing::info!(count = recs.len(), "Scheduled refresh complete");
            }
            Err(e) => {
                tracing::error!(error = %e, "Scheduled refresh failed");
            }
        }

        match recommendation_repo::prune_inactive(&pool, PRUNE_KEEP_DAYS).await {
            Ok(0) => {}
            Ok(n) => tracing::debug!(pruned = n, "Old inactive recommendations pruned"),
            Err(e) => tracing::warn!(error = %e, "Prune of inactive recommendations failed"),
        }
    }
}
