//! Injected exceptions.

use tracing::info;

use crate::observability::SOURCE;

/// Message used when the flag carries none.
pub const DEFAULT_MESSAGE: &str = "Injected exception";

/// Resolve the failure message and log the injection. The orchestrator
/// raises the resulting message as the invocation's outcome.
pub fn message(configured: Option<&str>) -> String {
    let message = configured.unwrap_or(DEFAULT_MESSAGE);

    info!(
        source = SOURCE,
        mode = "exception",
        action = "inject",
        exception_msg = message,
    );

    message.to_string()
}
