//! Invocation context.

use std::time::{SystemTime, UNIX_EPOCH};

/// Platform-supplied facts about one invocation.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Platform request identifier.
    pub request_id: String,
    /// Invocation deadline, epoch milliseconds. Zero means unknown.
    pub deadline_ms: u64,
}

impl Context {
    pub fn new(request_id: impl Into<String>, deadline_ms: u64) -> Self {
        Self {
            request_id: request_id.into(),
            deadline_ms,
        }
    }

    /// Milliseconds until the deadline, floored at zero.
    pub fn remaining_millis(&self) -> u64 {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        self.deadline_ms.saturating_sub(now_ms)
    }
}
