//! Forced timeouts.
//!
//! Sleeps toward the invocation deadline so the host's own timeout fires.
//! The buffer leaves just enough headroom for the handler to begin executing
//! before the deadline lands; the routine itself returns normally.

use tracing::info;

use crate::observability::SOURCE;
use crate::orchestrator::Context;

/// Sleep `max(0, remaining − buffer_ms)` where `remaining` is read from the
/// invocation context.
pub async fn inject(buffer_ms: u64, ctx: &Context) {
    let remaining_ms = ctx.remaining_millis();
    let sleep_ms = remaining_ms.saturating_sub(buffer_ms);

    info!(
        source = SOURCE,
        mode = "timeout",
        action = "inject",
        sleep_ms = sleep_ms,
        buffer_ms = buffer_ms,
        remaining_ms = remaining_ms,
    );

    tokio::time::sleep(tokio::time::Duration::from_millis(sleep_ms)).await;
}
