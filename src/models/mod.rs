pub mod contract;
pub mod earnings;
pub mod recommendation;

pub use contract::{OptionContract, OptionsChain};
pub use earnings::{EarningsEvent, EarningsTime};
pub use recommendation::Recommendation;

/// Ticker-syntax rule applied after every earnings fetch: 1-5 uppercase ASCII
/// letters, no digits, no `.` / `-` / `/`. Anything else is assumed not to be
/// a standard optionable US equity.
pub fn is_valid_symbol(symbol: &str) -> bool {
    (1..=5).contains(&symbol.len()) && symbol.chars().all(|c| c.is_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::is_valid_symbol;

    #[test]
    fn test_valid_symbols() {
        for s in ["A", "AAPL", "GOOGL", "MU"] {
            assert!(is_valid_symbol(s), "{s} should be valid");
        }
    }

    #[test]
    fn test_invalid_symbols() {
        for s in ["", "TOOLONG", "BRK.B", "RDS-A", "ABC/D", "abc", "AB1"] {
            assert!(!is_valid_symbol(s), "{s} should be rejected");
        }
    }
}
