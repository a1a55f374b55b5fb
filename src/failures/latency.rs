//! Added latency.

use rand::Rng;
use tracing::info;

use crate::observability::SOURCE;

/// Sleep a uniform integer number of milliseconds in `[min_ms, max_ms]`.
pub async fn inject(min_ms: u64, max_ms: u64) {
    let upper = max_ms.max(min_ms);
    let delay_ms = rand::thread_rng().gen_range(min_ms..=upper);

    info!(
        source = SOURCE,
        mode = "latency",
        action = "inject",
        latency_ms = delay_ms,
        min_latency = min_ms,
        max_latency = max_ms,
    );

    tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
}
