use serde::{Deserialize, Serialize};

use crate::config::AppConfig;

/// Filtering and ranking thresholds for one pipeline run. Immutable: each run
/// takes a snapshot up front, and updates produce a new value instead of
/// mutating shared state, so an in-flight run never sees a half-applied
/// change.
#[derive(Debug, Clone, Serialize)]
pub struct Criteria {
    /// Maximum acceptable |delta| — only far out-of-the-money puts.
    pub min_delta: f64,
    /// Premium as a percentage of the underlying, floor.
    pub min_premium_percentage: f64,
    pub min_days_to_expiry: i64,
    pub max_days_to_expiry: i64,
    /// Liquidity floors.
    pub min_volume: i64,
    pub min_open_interest: i64,
    /// Acceptable probability-of-profit band, in percent.
    pub min_pop: f64,
    pub max_pop: f64,
    /// How many prioritized symbols get options-chain fetches per run.
    pub max_symbols_to_process: usize,
    /// Symbols with a known cap below this are dropped before fetching.
    pub min_market_cap: f64,
    /// Symbols per options batch.
    pub batch_size: usize,
    /// Final truncation after ranking.
    pub max_recommendations: usize,
    /// Annualized risk-free rate fed into the pricing model.
    pub risk_free_rate: f64,
}

impl Default for Criteria {
    fn default() -> Self {
        Self {
            min_delta: 0.2,
            min_premium_percentage: 3.5,
            min_days_to_expiry: 1,
            max_days_to_expiry: 14,
            min_volume: 10,
            min_open_interest: 50,
            min_pop: 65.0,
            max_pop: 95.0,
            max_symbols_to_process: 50,
            min_market_cap: 1_000_000_000.0,
            batch_size: 10,
            max_recommendations: 25,
            risk_free_rate: 0.05,
        }
    }
}

impl Criteria {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            min_delta: config.min_delta,
            min_premium_percentage: config.min_premium_percentage,
            min_pop: config.min_pop,
            max_pop: config.max_pop,
            max_symbols_to_process: config.max_symbols_to_process,
            min_market_cap: config.min_market_cap,
            ..Self::default()
        }
    }

    /// Partial update: only fields present in `update` change. Returns a new
    /// value; the caller swaps it into the shared slot.
    pub fn apply(&self, update: &CriteriaUpdate) -> Criteria {
        Criteria {
            min_delta: update.min_delta.unwrap_or(self.min_delta),
            min_premium_percentage: update
                .min_premium_percentage
                .unwrap_or(self.min_premium_percentage),
            min_days_to_expiry: update.min_days_to_expiry.unwrap_or(self.min_days_to_expiry),
            max_days_to_expiry: update.max_days_to_expiry.unwrap_or(self.max_days_to_expiry),
            min_volume: update.min_volume.unwrap_or(self.min_volume),
            min_open_interest: update.min_open_interest.unwrap_or(self.min_open_interest),
            min_pop: update.min_pop.unwrap_or(self.min_pop),
            max_pop: update.max_pop.unwrap_or(self.max_pop),
            max_symbols_to_process: update
                .max_symbols_to_process
                .unwrap_or(self.max_symbols_to_process),
            min_market_cap: update.min_market_cap.unwrap_or(self.min_market_cap),
            batch_size: update.batch_size.unwrap_or(self.batch_size),
            max_recommendations: update
                .max_recommendations
                .unwrap_or(self.max_recommendations),
            risk_free_rate: update.risk_free_rate.unwrap_or(self.risk_free_rate),
        }
    }
}

/// Wire shape for criteria updates; absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CriteriaUpdate {
    pub min_delta: Option<f64>,
    pub min_premium_percentage: Option<f64>,
    pub min_days_to_expiry: Option<i64>,
    pub max_days_to_expiry: Option<i64>,
    pub min_volume: Option<i64>,
    pub min_open_interest: Option<i64>,
    pub min_pop: Option<f64>,
    pub max_pop: Option<f64>,
    pub max_symbols_to_process: Option<usize>,
    pub min_market_cap: Option<f64>,
    pub batch_size: Option<usize>,
    pub max_recommendations: Option<usize>,
    pub risk_free_rate: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_update_touches_only_present_fields() {
        let base = Criteria::default();
        let update = CriteriaUpdate {
            min_delta: Some(0.3),
            min_volume: Some(25),
            ..CriteriaUpdate::default()
        };

        let updated = base.apply(&update);
        assert_eq!(updated.min_delta, 0.3);
        assert_eq!(updated.min_volume, 25);
        // Everything else unchanged
        assert_eq!(updated.min_premium_percentage, base.min_premium_percentage);
        assert_eq!(updated.max_days_to_expiry, base.max_days_to_expiry);
        assert_eq!(updated.max_pop, base.max_pop);
        assert_eq!(updated.batch_size, base.batch_size);
    }

    #[test]
    fn test_empty_update_is_identity() {
        let base = Criteria::default();
        let updated = base.apply(&CriteriaUpdate::default());
        assert_eq!(
            serde_json::to_value(&base).unwrap(),
            serde_json::to_value(&updated).unwrap()
        );
    }
}
