use chrono::{DateTime, NaiveDate, Utc};

/// Sub-score weights for the composite confidence score.
const W_IV: f64 = 0.25;
const W_OI: f64 = 0.20;
const W_VOLUME: f64 = 0.20;
const W_EPS: f64 = 0.15;
const W_POP: f64 = 0.10;
const W_PREMIUM: f64 = 0.10;

// ---------------------------------------------------------------------------
// Time to expiry
// ---------------------------------------------------------------------------

/// Years until `expiration`, measured from `now`. Never negative.
pub fn time_to_expiry(expiration: NaiveDate, now: DateTime<Utc>) -> f64 {
    let days = (expiration - now.date_naive()).num_days() as f64;
    (days / 365.25).max(0.0)
}

/// Whole days until `expiration`, rounding the partial day up.
pub fn days_to_expiry(expiration: NaiveDate, now: DateTime<Utc>) -> i64 {
    (expiration - now.date_naive()).num_days()
}

// ---------------------------------------------------------------------------
// Probability of profit
// ---------------------------------------------------------------------------

/// Black-Scholes probability (in percent) that the stock finishes above the
/// strike at expiry, i.e. that a short put expires worthless:
///
///   d2 = (ln(S/K) + (r - sigma^2/2) * T) / (sigma * sqrt(T))
///   POP = phi(d2) * 100
///
/// Returns 0 when time or volatility is non-positive.
pub fn probability_of_profit(
    stock_price: f64,
    strike: f64,
    time_to_expiry_years: f64,
    risk_free_rate: f64,
    implied_vol: f64,
) -> f64 {
    if time_to_expiry_years <= 0.0 || implied_vol <= 0.0 {
        return 0.0;
    }

    let d2 = ((stock_price / strike).ln()
        + (risk_free_rate - 0.5 * implied_vol * implied_vol) * time_to_expiry_years)
        / (implied_vol * time_to_expiry_years.sqrt());

    norm_cdf(d2) * 100.0
}

/// Standard normal CDF via the Abramowitz & Stegun erf approximation
/// (formula 7.1.26, five-coefficient rational polynomial, max error ~1.5e-7).
pub fn norm_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / std::f64::consts::SQRT_2))
}

fn erf(x: f64) -> f64 {
    const A1: f64 = 0.254829592;
    const A2: f64 = -0.284496736;
    const A3: f64 = 1.421413741;
    const A4: f64 = -1.453152027;
    const A5: f64 = 1.061405429;
    const P: f64 = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + P * x);
    let y = 1.0 - (((((A5 * t + A4) * t) + A3) * t + A2) * t + A1) * t * (-x * x).exp();

    sign * y
}

// ---------------------------------------------------------------------------
// Confidence score
// ---------------------------------------------------------------------------

fn clamp01_100(v: f64) -> f64 {
    v.clamp(0.0, 100.0)
}

/// Composite 0-100 confidence score: weighted sum of six sub-scores, each
/// independently clamped to [0,100]. Lower IV scores higher; open interest
/// and volume are log-scaled liquidity proxies.
pub fn confidence_score(
    implied_vol: f64,
    open_interest: i64,
    volume: i64,
    eps_growth_pct: f64,
    pop: f64,
    premium_pct: f64,
) -> f64 {
    let iv_score = (100.0 - implied_vol * 200.0).max(0.0);
    let oi_score = ((open_interest.max(1) as f64).log10() * 25.0).min(100.0);
    let volume_score = ((volume.max(1) as f64).log10() * 20.0).min(100.0);
    let eps_score = clamp01_100((eps_growth_pct + 50.0) * 1.33);
    let pop_score = clamp01_100(pop);
    let premium_score = (premium_pct * 20.0).min(100.0);

    let score = clamp01_100(iv_score) * W_IV
        + clamp01_100(oi_score) * W_OI
        + clamp01_100(volume_score) * W_VOLUME
        + eps_score * W_EPS
        + pop_score * W_POP
        + clamp01_100(premium_score) * W_PREMIUM;

    clamp01_100(score)
}

// ---------------------------------------------------------------------------
// Trade arithmetic
// ---------------------------------------------------------------------------

/// Price below which the short put loses money at expiry.
pub fn breakeven(strike: f64, premium: f64) -> f64 {
    strike - premium
}

/// Worst-case loss for one contract (100 shares), stock going to zero.
pub fn max_loss(strike: f64, premium: f64) -> f64 {
    (strike - premium) * 100.0
}

/// Premium as a percentage of the underlying price; 0 for a non-positive
/// stock price.
pub fn premium_percentage(premium: f64, stock_price: f64) -> f64 {
    if stock_price > 0.0 {
        premium / stock_price * 100.0
    } else {
        0.0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_norm_cdf_reference_values() {
        // Spot checks against a reference normal CDF, to 4 decimal places.
        assert!((norm_cdf(0.0) - 0.5).abs() < 1e-7);
        assert!((norm_cdf(1.0) - 0.841345).abs() < 1e-4);
        assert!((norm_cdf(1.96) - 0.975002).abs() < 1e-4);
        assert!((norm_cdf(-1.96) - 0.024998).abs() < 1e-4);
        assert!((norm_cdf(3.0) - 0.998650).abs() < 1e-4);
    }

    #[test]
    fn test_pop_zero_guards() {
        assert_eq!(probability_of_profit(100.0, 95.0, 0.0, 0.05, 0.3), 0.0);
        assert_eq!(probability_of_profit(100.0, 95.0, -0.1, 0.05, 0.3), 0.0);
        assert_eq!(probability_of_profit(100.0, 95.0, 0.1, 0.05, 0.0), 0.0);
        assert_eq!(probability_of_profit(100.0, 95.0, 0.1, 0.05, -0.5), 0.0);
    }

    #[test]
    fn test_pop_monotonic_in_strike() {
        // Deeper out-of-the-money puts (lower strikes) must never score a
        // lower probability of profit.
        let mut prev = 0.0;
        for strike in [99.0, 95.0, 90.0, 80.0, 60.0, 30.0, 5.0] {
            let pop = probability_of_profit(100.0, strike, 0.05, 0.05, 0.30);
            assert!(
                pop >= prev,
                "POP should be non-decreasing as strike falls: K={strike} pop={pop} prev={prev}"
            );
            prev = pop;
        }
    }

    #[test]
    fn test_pop_known_value() {
        // S=100, K=95, T=8/365.25, r=5%, sigma=30%.
        // d2 = (ln(100/95) + (0.05 - 0.045) * T) / (0.3 * sqrt(T)) = 1.15777...
        // phi(d2) = 0.87650...
        let t = 8.0 / 365.25;
        let pop = probability_of_profit(100.0, 95.0, t, 0.05, 0.30);
        assert!((pop - 87.65).abs() < 0.05, "pop = {pop}");
    }

    #[test]
    fn test_confidence_score_bounds() {
        let extremes = [
            (0.0, 0, 0, 0.0, 0.0, 0.0),
            (10.0, i64::MAX, i64::MAX, 1e9, 1e9, 1e9),
            (-5.0, -100, -100, -1e9, -50.0, -3.0),
            (0.3, 1000, 500, 12.0, 85.0, 4.0),
        ];
        for (iv, oi, vol, eps, pop, prem) in extremes {
            let score = confidence_score(iv, oi, vol, eps, pop, prem);
            assert!(
                (0.0..=100.0).contains(&score),
                "score {score} out of bounds for iv={iv} oi={oi}"
            );
        }
    }

    #[test]
    fn test_confidence_score_prefers_liquidity() {
        let thin = confidence_score(0.30, 10, 5, 0.0, 80.0, 4.0);
        let deep = confidence_score(0.30, 10_000, 5_000, 0.0, 80.0, 4.0);
        assert!(deep > thin);
    }

    #[test]
    fn test_trade_arithmetic_exact() {
        assert_eq!(breakeven(95.0, 4.0), 91.0);
        assert_eq!(max_loss(95.0, 4.0), 9100.0);
        assert_eq!(breakeven(50.0, 0.0), 50.0);
        assert_eq!(max_loss(12.5, 1.25), 1125.0);
    }

    #[test]
    fn test_premium_percentage() {
        assert_eq!(premium_percentage(4.0, 100.0), 4.0);
        assert_eq!(premium_percentage(4.0, 0.0), 0.0);
        assert_eq!(premium_percentage(4.0, -10.0), 0.0);
    }

    #[test]
    fn test_time_to_expiry_never_negative() {
        let now = Utc::now();
        let past = (now - Duration::days(30)).date_naive();
        assert_eq!(time_to_expiry(past, now), 0.0);

        let future = (now + Duration::days(365)).date_naive();
        let t = time_to_expiry(future, now);
        assert!((t - 365.0 / 365.25).abs() < 1e-9);
    }
}
