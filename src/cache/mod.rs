use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::PgPool;

/// How much longer the stale (fallback-only) copy outlives the fresh one.
const STALE_TTL_FACTOR: i64 = 24;

#[derive(Debug, sqlx::FromRow)]
struct CacheRow {
    payload: serde_json::Value,
    expires_at: DateTime<Utc>,
    stale_expires_at: DateTime<Utc>,
}

/// Durable key -> JSON cache over the `api_cache` table. Each row carries a
/// soft expiry (normal reads) and a hard expiry (fallback reads after an
/// upstream failure), so one upsert keeps both copies consistent.
///
/// Reads never error: missing, expired, undecodable and query-failure all
/// come back as `None`, so callers cannot tell "not cached" from "cache
/// unavailable". Writes report success as a bool and are best-effort.
#[derive(Clone)]
pub struct CacheStore {
    pool: PgPool,
}

impl CacheStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetch a fresh value for `key`, honoring the soft expiry.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.read(key).await.and_then(|row| {
            if row.expires_at > Utc::now() {
                serde_json::from_value(row.payload).ok()
            } else {
                None
            }
        })
    }

    /// Fetch a possibly-stale value for `key`, honoring only the hard
    /// expiry. Used exclusively by gateway fallback paths.
    pub async fn get_stale<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.read(key).await.and_then(|row| {
            if row.stale_expires_at > Utc::now() {
                serde_json::from_value(row.payload).ok()
            } else {
                None
            }
        })
    }

    async fn read(&self, key: &str) -> Option<CacheRow> {
        let result = sqlx::query_as::<_, CacheRow>(
            "SELECT payload, expires_at, stale_expires_at FROM api_cache WHERE cache_key = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await;

        match result {
            Ok(row) => row,
            Err(e) => {
                tracing::debug!(error = %e, key, "Cache read failed, treating as miss");
                None
            }
        }
    }

    /// Upsert `value` under `key` with a soft TTL of `ttl_minutes` and a hard
    /// TTL a multiple of that. Returns whether the write succeeded.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl_minutes: i64) -> bool {
        let payload = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, key, "Cache value failed to serialize");
                return false;
            }
        };

        let now = Utc::now();
        let expires_at = now + Duration::minutes(ttl_minutes);
        let stale_expires_at = now + Duration::minutes(ttl_minutes * STALE_TTL_FACTOR);

        let result = sqlx::query(
            r#"
            INSERT INTO api_cache (cache_key, payload, expires_at, stale_expires_at, updated_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (cache_key) DO UPDATE
            SET payload = EXCLUDED.payload,
                expires_at = EXCLUDED.expires_at,
                stale_expires_at = EXCLUDED.stale_expires_at,
                updated_at = NOW()
            "#,
        )
        .bind(key)
        .bind(&payload)
        .bind(expires_at)
        .bind(stale_expires_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, key, "Cache write failed");
                false
            }
        }
    }

    /// Delete all entries whose key starts with `prefix`. A force refresh is
    /// a cache clear plus a new run, not a cancellation of an in-flight one.
    pub async fn clear_prefix(&self, prefix: &str) -> bool {
        let pattern = format!("{}%", prefix.replace('%', "\\%").replace('_', "\\_"));
        sqlx::query("DELETE FROM api_cache WHERE cache_key LIKE $1")
            .bind(&pattern)
            .execute(&self.pool)
            .await
            .map(|r| {
                tracing::debug!(prefix, deleted = r.rows_affected(), "Cache prefix cleared");
                true
            })
            .unwrap_or(false)
    }
}

/// Deterministic cache keys encoding the logical query. The prefix constants
/// are the unit `clear_prefix` operates on.
pub mod keys {
    use chrono::NaiveDate;

    pub const EARNINGS_PREFIX: &str = "earnings_";
    pub const EPS_GROWTH_PREFIX: &str = "eps_growth_";
    pub const PROFILE_PREFIX: &str = "profile_";
    pub const STOCK_PRICE_PREFIX: &str = "stock_price_";
    pub const OPTIONS_PREFIX: &str = "options_";

    pub fn earnings(from: NaiveDate, to: NaiveDate) -> String {
        format!("{EARNINGS_PREFIX}{from}_{to}")
    }

    pub fn eps_growth(symbol: &str) -> String {
        format!("{EPS_GROWTH_PREFIX}{symbol}")
    }

    pub fn profile(symbol: &str) -> String {
        format!("{PROFILE_PREFIX}{symbol}")
    }

    pub fn stock_price(symbol: &str) -> String {
        format!("{STOCK_PRICE_PREFIX}{symbol}")
    }

    pub fn options(symbol: &str, expiration: Option<NaiveDate>) -> String {
        match expiration {
            Some(exp) => format!("{OPTIONS_PREFIX}{symbol}_{exp}"),
            None => format!("{OPTIONS_PREFIX}{symbol}"),
        }
    }
}
