//! The host-resolution entry point.
//!
//! Callers resolve through [`lookup`]. When interception is active and the
//! hostname matches a deny pattern, the lookup fails with the same shape a
//! real NXDOMAIN produces — error code, hostname, and syscall name all
//! populated — delivered on a later tick so a denied lookup is never
//! observably synchronous. Everything else passes through to the resolver
//! captured before the first interception.

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use crate::observability::SOURCE;

/// Error code carried by denied lookups, matching the NXDOMAIN outcome.
pub const NOT_FOUND_CODE: &str = "ENOTFOUND";

const SYSCALL: &str = "getaddrinfo";

/// Host-resolution failure.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The hostname did not resolve — real or injected, the shape is the same.
    #[error("{syscall} {code} {hostname}")]
    HostNotFound {
        hostname: String,
        code: &'static str,
        syscall: &'static str,
    },
    #[error("lookup failed: {0}")]
    Io(#[from] std::io::Error),
}

impl ResolveError {
    fn not_found(hostname: &str) -> Self {
        ResolveError::HostNotFound {
            hostname: hostname.to_string(),
            code: NOT_FOUND_CODE,
            syscall: SYSCALL,
        }
    }
}

/// A host resolver. The system implementation is captured once per
/// container; tests may capture a fake by calling [`capture`] first.
#[async_trait]
pub trait HostResolve: Send + Sync {
    async fn resolve(&self, hostname: &str, port: u16) -> Result<Vec<SocketAddr>, ResolveError>;
}

/// Resolution through the operating system.
pub struct SystemResolver;

#[async_trait]
impl HostResolve for SystemResolver {
    async fn resolve(&self, hostname: &str, port: u16) -> Result<Vec<SocketAddr>, ResolveError> {
        let addrs: Vec<SocketAddr> = tokio::net::lookup_host((hostname, port))
            .await
            .map_err(ResolveError::Io)?
            .collect();
        if addrs.is_empty() {
            return Err(ResolveError::not_found(hostname));
        }
        Ok(addrs)
    }
}

static ORIGINAL: OnceLock<Arc<dyn HostResolve>> = OnceLock::new();

/// Capture a specific resolver as the original entry point. First capture
/// wins; later calls (including the implicit system capture) are no-ops.
pub fn capture(resolver: Arc<dyn HostResolve>) {
    let _ = ORIGINAL.set(resolver);
}

/// The captured original resolver, defaulting to the system's.
pub(crate) fn original() -> Arc<dyn HostResolve> {
    ORIGINAL
        .get_or_init(|| Arc::new(SystemResolver))
        .clone()
}

/// Resolve a hostname, honoring the active denylist.
///
/// Denied hostnames log a `block` record and fail with
/// [`ResolveError::HostNotFound`] after yielding, so the denial is delivered
/// asynchronously like a real lookup miss. Non-matching hostnames delegate
/// to the captured original.
pub async fn lookup(hostname: &str, port: u16) -> Result<Vec<SocketAddr>, ResolveError> {
    if super::is_denied(hostname) {
        warn!(
            source = SOURCE,
            mode = "denylist",
            action = "block",
            hostname = hostname,
        );
        tokio::task::yield_now().await;
        return Err(ResolveError::not_found(hostname));
    }
    original().resolve(hostname, port).await
}
