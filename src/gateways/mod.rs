pub mod earnings;
pub mod options;

pub use earnings::EarningsGateway;
pub use options::{MultiChainResult, OptionsGateway};

use rand::Rng;
use std::time::Duration;

/// Sleep for a random duration in `[min_ms, max_ms]`. Deliberate pacing
/// between upstream batches keeps us under fixed per-minute quotas.
pub(crate) async fn jittered_pause(min_ms: u64, max_ms: u64) {
    let ms = rand::thread_rng().gen_range(min_ms..=max_ms);
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
