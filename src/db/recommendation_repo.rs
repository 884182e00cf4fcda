use sqlx::PgPool;

use crate::models::Recommendation;

/// The currently active recommendation set, best first.
pub async fn get_active(pool: &PgPool) -> Result<Vec<Recommendation>, sqlx::Error> {
    sqlx::query_as::<_, Recommendation>(
        "SELECT * FROM recommendations WHERE is_active = true ORDER BY confidence_score DESC",
    )
    .fetch_all(pool)
    .await
}

/// Swap in a new active generation: deactivate every active row and insert
/// the new set inside one transaction, so a crash mid-write can never leave
/// zero or two active generations.
pub async fn replace_active_set(
    pool: &PgPool,
    recommendations: &[Recommendation],
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("UPDATE recommendations SET is_active = false WHERE is_active = true")
        .execute(&mut *tx)
        .await?;

    for rec in recommendations {
        sqlx::query(
            r#"
            INSERT INTO recommendations (
                id, symbol, strike, expiration, premium,
                confidence_score, probability_of_profit, delta, implied_volatility,
                premium_percentage, max_loss, breakeven, earnings_date,
                volume, open_interest, stock_price, eps_growth, is_active, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            "#,
        )
        .bind(rec.id)
        .bind(&rec.symbol)
        .bind(rec.strike)
        .bind(rec.expiration)
        .bind(rec.premium)
        .bind(rec.confidence_score)
        .bind(rec.probability_of_profit)
        .bind(rec.delta)
        .bind(rec.implied_volatility)
        .bind(rec.premium_percentage)
        .bind(rec.max_loss)
        .bind(rec.breakeven)
        .bind(rec.earnings_date)
        .bind(rec.volume)
        .bind(rec.open_interest)
        .bind(rec.stock_price)
        .bind(rec.eps_growth)
        .bind(rec.is_active)
        .bind(rec.created_at)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await
}

/// Drop deactivated rows older than `keep_days` (housekeeping).
pub async fn prune_inactive(pool: &PgPool, keep_days: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "DELETE FROM recommendations
         WHERE is_active = false AND created_at < NOW() - ($1 || ' days')::interval",
    )
    .bind(keep_days.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
