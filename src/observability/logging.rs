//! Structured JSON logging.
//!
//! Every record the library emits is a single JSON object on one line with a
//! stable envelope: `source` (always [`SOURCE`]), `level`, and an `action`
//! drawn from a closed set (`config`, `inject`, `block`, `dryrun`, `error`,
//! `clear`). Mode-specific payload rides as additional fields.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Constant `source` field carried by every log record.
pub const SOURCE: &str = "failure-lambda";

/// Install the line-delimited JSON subscriber.
///
/// Safe to call once per process; hosting code that already installs its own
/// subscriber can skip this and the library's records will flow through it.
pub fn init() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_target(false)
                .with_current_span(false),
        )
        .init();
}
