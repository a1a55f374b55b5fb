//! The direct handler wrapper.

use std::future::Future;

use serde_json::Value;
use tracing::error;

use crate::observability::SOURCE;
use crate::orchestrator::{
    Context, HandlerError, InvocationError, Options, Pipeline, PreOutcome,
};

/// Wrap a handler with the injection pipeline.
///
/// The handler takes the invocation event and context and returns its result
/// or its own error; the wrapped handler has the same shape with injected
/// failures layered in. With no enabled flags (or every roll missing), the
/// handler's inputs, outputs, and errors pass through untouched.
pub fn wrap<F, Fut>(handler: F, options: Options) -> Wrapped<F>
where
    F: Fn(Value, Context) -> Fut,
    Fut: Future<Output = Result<Value, HandlerError>>,
{
    Wrapped {
        handler,
        pipeline: Pipeline::new(options),
    }
}

/// A handler with the injection pipeline around it.
pub struct Wrapped<F> {
    handler: F,
    pipeline: Pipeline,
}

impl<F, Fut> Wrapped<F>
where
    F: Fn(Value, Context) -> Fut,
    Fut: Future<Output = Result<Value, HandlerError>>,
{
    /// Run one invocation.
    pub async fn invoke(&self, event: Value, ctx: Context) -> Result<Value, InvocationError> {
        if Pipeline::disabled() {
            return (self.handler)(event, ctx)
                .await
                .map_err(InvocationError::Handler);
        }

        match self.run(event, ctx).await {
            Ok(result) => Ok(result),
            Err(e) => {
                error!(
                    source = SOURCE,
                    action = "error",
                    message = %e,
                );
                Pipeline::cleanup().await;
                Err(e)
            }
        }
    }

    async fn run(&self, event: Value, ctx: Context) -> Result<Value, InvocationError> {
        let post = match self.pipeline.pre_phase(&event, &ctx).await {
            PreOutcome::Respond(response) => return Ok(response),
            PreOutcome::Raise(e) => return Err(e),
            PreOutcome::Proceed(post) => post,
        };

        let result = (self.handler)(event.clone(), ctx)
            .await
            .map_err(InvocationError::Handler)?;

        Ok(self.pipeline.post_phase(post, &event, result).await)
    }
}
