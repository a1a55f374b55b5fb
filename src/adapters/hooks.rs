//! Hook-style adapter for middleware stacks.
//!
//! Frameworks that own the handler call integrate by running [`before`] on
//! the way in, [`after`] on the way out, and [`on_error`] on their failure
//! path. `before` hands back a [`PostPhase`] token that carries the deferred
//! corruption work to the matching `after` call.
//!
//! [`before`]: InjectionHooks::before
//! [`after`]: InjectionHooks::after
//! [`on_error`]: InjectionHooks::on_error

use serde_json::Value;
use tracing::error;

use crate::observability::SOURCE;
use crate::orchestrator::{Context, InvocationError, Options, Pipeline, PostPhase, PreOutcome};

/// What the pre-phase decided, from the middleware's point of view.
#[derive(Debug)]
pub enum BeforeOutcome {
    /// Call the handler, then pass the token to `after`.
    Proceed(PostPhase),
    /// Respond with this value; do not call the handler or `after`.
    Respond(Value),
}

/// The injection pipeline as a set of hooks.
pub struct InjectionHooks {
    pipeline: Pipeline,
}

impl InjectionHooks {
    pub fn new(options: Options) -> Self {
        Self {
            pipeline: Pipeline::new(options),
        }
    }

    /// Run the pre-phase. An injected exception surfaces as `Err`; the
    /// middleware propagates it as the invocation's outcome.
    pub async fn before(
        &self,
        event: &Value,
        ctx: &Context,
    ) -> Result<BeforeOutcome, InvocationError> {
        if Pipeline::disabled() {
            return Ok(BeforeOutcome::Proceed(PostPhase::empty()));
        }
        match self.pipeline.pre_phase(event, ctx).await {
            PreOutcome::Proceed(post) => Ok(BeforeOutcome::Proceed(post)),
            PreOutcome::Respond(response) => Ok(BeforeOutcome::Respond(response)),
            PreOutcome::Raise(e) => Err(e),
        }
    }

    /// Run the post-phase over the handler's result.
    pub async fn after(&self, post: PostPhase, event: &Value, result: Value) -> Value {
        if Pipeline::disabled() {
            return result;
        }
        self.pipeline.post_phase(post, event, result).await
    }

    /// The middleware's error path: logs one structured error record and
    /// runs cleanup. The framework re-raises the error itself.
    pub async fn on_error(&self, failure: &dyn std::fmt::Display) {
        error!(
            source = SOURCE,
            action = "error",
            message = %failure,
        );
        Pipeline::cleanup().await;
    }
}
