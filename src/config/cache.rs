//! Container-scoped configuration caching.
//!
//! One cached entry per process, bounded by a TTL. The hosted backend runs
//! behind a local extension that polls and caches on its own, so library
//! caching defaults off there — stacking a second cache only adds staleness.

use std::time::{Duration, Instant};

use tracing::warn;

use crate::config::schema::Configuration;
use crate::observability::SOURCE;

/// Default TTL when the backend has no external cache of its own.
pub const DEFAULT_TTL_SECONDS: u64 = 60;

/// Name of the TTL override variable.
pub const CACHE_TTL_VAR: &str = "FAILURE_CACHE_TTL";

/// The last fetched configuration and when it was fetched.
#[derive(Debug, Clone)]
pub(crate) struct CachedEntry {
    pub config: Configuration,
    pub fetched_at: Instant,
}

impl CachedEntry {
    pub fn new(config: Configuration) -> Self {
        Self {
            config,
            fetched_at: Instant::now(),
        }
    }

    /// Whether this entry may still be served. A zero TTL is never fresh.
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        !ttl.is_zero() && self.fetched_at.elapsed() < ttl
    }
}

/// Resolve the effective TTL from the environment.
pub(crate) fn ttl(hosted_backend: bool) -> Duration {
    let explicit = std::env::var(CACHE_TTL_VAR).ok().filter(|v| !v.is_empty());
    ttl_from(explicit.as_deref(), hosted_backend)
}

/// TTL policy, separated from the environment read for testing.
///
/// An explicit non-negative value wins (`0` disables caching; a positive
/// value with the hosted backend warns about double caching). Otherwise the
/// hosted backend gets `0` and everything else the 60 s default. An
/// unparseable value warns and falls back to the 60 s default.
pub(crate) fn ttl_from(explicit: Option<&str>, hosted_backend: bool) -> Duration {
    match explicit {
        None => {
            if hosted_backend {
                Duration::ZERO
            } else {
                Duration::from_secs(DEFAULT_TTL_SECONDS)
            }
        }
        Some(raw) => match raw.parse::<f64>() {
            Ok(seconds) if seconds >= 0.0 && seconds.is_finite() => {
                if seconds > 0.0 && hosted_backend {
                    warn!(
                        source = SOURCE,
                        action = "config",
                        ttl_seconds = seconds,
                        message = "positive cache TTL with the hosted backend — the extension already caches at its poll interval; library caching adds staleness",
                    );
                }
                Duration::from_secs_f64(seconds)
            }
            _ => {
                warn!(
                    source = SOURCE,
                    action = "config",
                    value = raw,
                    message = format!("invalid {CACHE_TTL_VAR}, using default {DEFAULT_TTL_SECONDS}s"),
                );
                Duration::from_secs(DEFAULT_TTL_SECONDS)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_ttl_wins() {
        assert_eq!(ttl_from(Some("30"), false), Duration::from_secs(30));
        assert_eq!(ttl_from(Some("30"), true), Duration::from_secs(30));
        assert_eq!(ttl_from(Some("0.5"), false), Duration::from_secs_f64(0.5));
    }

    #[test]
    fn zero_disables_caching() {
        assert_eq!(ttl_from(Some("0"), false), Duration::ZERO);
    }

    #[test]
    fn hosted_backend_defaults_to_no_cache() {
        assert_eq!(ttl_from(None, true), Duration::ZERO);
        assert_eq!(ttl_from(None, false), Duration::from_secs(DEFAULT_TTL_SECONDS));
    }

    #[test]
    fn unparseable_ttl_falls_back_to_default() {
        assert_eq!(
            ttl_from(Some("soon"), false),
            Duration::from_secs(DEFAULT_TTL_SECONDS)
        );
        assert_eq!(
            ttl_from(Some("-5"), true),
            Duration::from_secs(DEFAULT_TTL_SECONDS)
        );
    }

    #[test]
    fn zero_ttl_entry_is_never_fresh() {
        let entry = CachedEntry::new(Configuration::new());
        assert!(!entry.is_fresh(Duration::ZERO));
        assert!(entry.is_fresh(Duration::from_secs(60)));
    }
}
