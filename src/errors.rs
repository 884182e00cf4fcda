use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Domain error shared by the market-data clients, gateways and the
/// recommendation engine.
#[derive(Debug, thiserror::Error)]
pub enum MarketError {
    #[error("rate limit exceeded for {provider}, retry in ~{}s", suggested_wait.as_secs())]
    RateLimitExceeded {
        provider: &'static str,
        suggested_wait: Duration,
    },

    #[error("unexpected response shape: {0}")]
    InvalidResponse(String),

    #[error("upstream HTTP {status}: {body}")]
    UpstreamHttp { status: u16, body: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("persistence failed: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error("not enough data: {0}")]
    NotEnoughData(String),
}

impl MarketError {
    /// Whether this error is rate-limit flavored, either from our local gate
    /// or an upstream 429. Callers use this to show a "try later or use demo
    /// data" message instead of a generic failure.
    pub fn is_rate_limited(&self) -> bool {
        matches!(
            self,
            MarketError::RateLimitExceeded { .. } | MarketError::UpstreamHttp { status: 429, .. }
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::RateLimited(msg) => (StatusCode::TOO_MANY_REQUESTS, msg.clone()),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".into())
            }
        };

        (
            status,
            Json(ErrorBody {
                success: false,
                error: message,
            }),
        )
            .into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Internal(e.into())
    }
}

impl From<MarketError> for AppError {
    fn from(e: MarketError) -> Self {
        if e.is_rate_limited() {
            AppError::RateLimited(
                "Upstream rate limit reached — try again later or use demo data".into(),
            )
        } else {
            AppError::Internal(e.into())
        }
    }
}
