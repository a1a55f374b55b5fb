//! Outbound DNS denial.
//!
//! # Design Decisions
//! - The active pattern set is container-scoped and replaced atomically on
//!   each install; installation is idempotent
//! - The original host-resolution entry point is captured before the first
//!   interception and restored by [`clear`]
//! - One invalid pattern is logged and skipped; it never disables the rest
//! - Denied lookups resolve on a later tick with an NXDOMAIN-shaped error
//!   (see [`interceptor`])
//!
//! State machine: `inactive → active` on first install, `active → active`
//! on reinstall (pattern set replaced), `active → inactive` on clear.

pub mod interceptor;

use std::sync::{Arc, PoisonError, RwLock};

use regex::Regex;
use tracing::{error, info};

use crate::observability::SOURCE;

pub use interceptor::{lookup, HostResolve, ResolveError, SystemResolver};

/// Compiled deny patterns.
#[derive(Debug, Default)]
struct DenySet {
    patterns: Vec<Regex>,
}

impl DenySet {
    fn matches(&self, hostname: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(hostname))
    }
}

static ACTIVE: RwLock<Option<Arc<DenySet>>> = RwLock::new(None);

/// Install the deny patterns, replacing any active set.
///
/// Patterns that fail to compile are logged and skipped. The original
/// resolution entry point is captured before activation.
pub fn install(patterns: &[String]) {
    interceptor::original();

    let mut compiled = Vec::with_capacity(patterns.len());
    for pattern in patterns {
        match Regex::new(pattern) {
            Ok(re) => compiled.push(re),
            Err(e) => {
                error!(
                    source = SOURCE,
                    mode = "denylist",
                    action = "error",
                    pattern = %pattern,
                    message = format!("invalid deny pattern: {e}"),
                );
            }
        }
    }

    info!(
        source = SOURCE,
        mode = "denylist",
        action = "inject",
        pattern_count = compiled.len(),
    );

    *ACTIVE.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(DenySet {
        patterns: compiled,
    }));
}

/// Deactivate interception, restoring pass-through resolution. Idempotent.
pub fn clear() {
    let cleared = ACTIVE
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .take()
        .is_some();
    if cleared {
        info!(source = SOURCE, mode = "denylist", action = "clear");
    }
}

/// Whether interception is currently active.
pub fn is_active() -> bool {
    ACTIVE.read().unwrap_or_else(PoisonError::into_inner).is_some()
}

/// Whether the hostname matches any active deny pattern. Pure predicate;
/// `false` whenever interception is inactive.
pub fn is_denied(hostname: &str) -> bool {
    let active = ACTIVE.read().unwrap_or_else(PoisonError::into_inner).clone();
    active.is_some_and(|set| set.matches(hostname))
}
