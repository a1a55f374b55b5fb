//! The per-invocation injection pipeline.
//!
//! # Data Flow
//! ```text
//! event, context
//!     → kill-switch gate (pass the handler through untouched)
//!     → configuration (provider → cache → backend)
//!     → resolved plan (enabled flags, execution order)
//!     → pre-cleanup (denylist + diskspace from the previous invocation)
//!     → pre-phase: match gate → roll → dry-run gate → primitive
//!         statuscode short-circuits, exception raises
//!     → handler
//!     → post-phase: corruption under the same gates
//!     → result
//! ```
//!
//! Any error after the kill-switch gate logs one record, runs cleanup, and
//! re-raises unchanged.

pub mod context;

use std::sync::Arc;

use rand::Rng;
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::config::loader::{self, ConfigProvider};
use crate::config::schema::{resolve_failures, FailureMode, FailurePayload, ResolvedFailure};
use crate::denylist;
use crate::failures::{corruption, diskspace, exception, latency, statuscode, timeout};
use crate::matching;
use crate::observability::SOURCE;

pub use context::Context;

/// Kill switch: the literal value `true` disables all injection.
pub const KILL_SWITCH_VAR: &str = "FAILURE_LAMBDA_DISABLED";

/// Errors a user handler may return, transported unchanged.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The outcome of a wrapped invocation that did not return a value.
#[derive(Debug, Error)]
pub enum InvocationError {
    /// An intentionally injected failure.
    #[error("{0}")]
    Injected(String),
    /// The user handler's own error.
    #[error(transparent)]
    Handler(#[from] HandlerError),
}

/// Replaceable roll source: returns a value in `[0, 100)` compared against
/// each flag's percentage.
pub type RollFn = Arc<dyn Fn() -> f64 + Send + Sync>;

/// Wrapper options.
#[derive(Clone, Default)]
pub struct Options {
    /// Configuration source override; the shared loader when unset.
    pub config_provider: Option<Arc<dyn ConfigProvider>>,
    /// Log what would fire without performing any effect.
    pub dry_run: bool,
    /// Roll source override; the thread PRNG when unset.
    pub roll: Option<RollFn>,
}

/// What the pre-phase decided.
pub(crate) enum PreOutcome {
    /// Run the handler, then the carried post-phase.
    Proceed(PostPhase),
    /// Short-circuit with this response; the handler is skipped.
    Respond(Value),
    /// Fail the invocation; the handler is skipped.
    Raise(InvocationError),
}

/// The work deferred until after the handler: at most one corruption entry.
#[derive(Debug)]
pub struct PostPhase {
    corruption: Option<ResolvedFailure>,
}

impl PostPhase {
    pub(crate) fn empty() -> Self {
        Self { corruption: None }
    }
}

/// The shared per-invocation engine behind both adapters.
#[derive(Clone)]
pub(crate) struct Pipeline {
    provider: Arc<dyn ConfigProvider>,
    dry_run: bool,
    roll: RollFn,
}

impl Pipeline {
    pub fn new(options: Options) -> Self {
        Self {
            provider: options
                .config_provider
                .unwrap_or_else(|| loader::shared() as Arc<dyn ConfigProvider>),
            dry_run: options.dry_run,
            roll: options
                .roll
                .unwrap_or_else(|| Arc::new(|| rand::thread_rng().gen::<f64>() * 100.0)),
        }
    }

    /// Whether the kill switch disables all injection.
    pub fn disabled() -> bool {
        std::env::var(KILL_SWITCH_VAR).is_ok_and(|v| v == "true")
    }

    /// Remove side effects an earlier invocation may have left behind.
    /// Runs unconditionally at the top of every invocation — the prior
    /// invocation's denylist or fill files must not leak into one whose roll
    /// does not fire — and again on the error path.
    pub async fn cleanup() {
        denylist::clear();
        tokio::task::spawn_blocking(diskspace::clear).await.ok();
    }

    /// Match and roll gates shared by both phases. Returns whether the entry
    /// fires; a dry-run "fire" logs instead of injecting.
    fn gates_pass(&self, failure: &ResolvedFailure, event: &Value) -> bool {
        if !failure.flag.conditions.is_empty()
            && !matching::matches(event, &failure.flag.conditions)
        {
            return false;
        }
        (self.roll)() < failure.percentage as f64
    }

    fn log_dry_run(&self, failure: &ResolvedFailure) {
        info!(
            source = SOURCE,
            mode = %failure.mode,
            action = "dryrun",
            percentage = failure.percentage,
        );
    }

    /// Fetch configuration, resolve the plan, and run the pre-phase.
    pub async fn pre_phase(&self, event: &Value, ctx: &Context) -> PreOutcome {
        let config = self.provider.get_config().await;
        let plan = resolve_failures(&config);

        Self::cleanup().await;

        let mut post = PostPhase::empty();

        for failure in plan {
            if failure.mode == FailureMode::Corruption {
                post.corruption = Some(failure);
                continue;
            }
            if !self.gates_pass(&failure, event) {
                continue;
            }
            if self.dry_run {
                self.log_dry_run(&failure);
                continue;
            }

            match &failure.flag.payload {
                FailurePayload::Latency { min_ms, max_ms } => {
                    latency::inject(*min_ms, *max_ms).await;
                }
                FailurePayload::Timeout { buffer_ms } => {
                    timeout::inject(*buffer_ms, ctx).await;
                }
                FailurePayload::Diskspace { megabytes } => {
                    let megabytes = *megabytes;
                    tokio::task::spawn_blocking(move || diskspace::inject(megabytes))
                        .await
                        .ok();
                }
                FailurePayload::Denylist { patterns } => {
                    denylist::install(patterns);
                }
                FailurePayload::Statuscode { code } => {
                    return PreOutcome::Respond(statuscode::build(*code));
                }
                FailurePayload::Exception { message } => {
                    return PreOutcome::Raise(InvocationError::Injected(exception::message(
                        message.as_deref(),
                    )));
                }
                // Corruption entries were diverted to the post-phase above.
                FailurePayload::Corruption { .. } => {}
            }
        }

        PreOutcome::Proceed(post)
    }

    /// Apply the deferred corruption entry to the handler's result.
    pub async fn post_phase(&self, post: PostPhase, event: &Value, result: Value) -> Value {
        let Some(failure) = post.corruption else {
            return result;
        };
        if !self.gates_pass(&failure, event) {
            return result;
        }
        if self.dry_run {
            self.log_dry_run(&failure);
            return result;
        }
        let FailurePayload::Corruption { body } = &failure.flag.payload else {
            return result;
        };
        corruption::corrupt(body.as_deref(), result)
    }
}

/// Evict the cached configuration, deactivate the denylist, and remove any
/// disk-fill files. The container starts the next invocation clean.
pub async fn reset() {
    loader::shared().clear_cache().await;
    denylist::clear();
    tokio::task::spawn_blocking(diskspace::clear).await.ok();
}
