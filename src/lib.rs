//! Configurable failure injection for serverless function invocations.
//!
//! Wrap a handler, describe the active failures in a remotely fetched
//! feature-flag document, and every invocation is observed or perturbed
//! accordingly: added latency, forced timeouts, injected exceptions,
//! substituted status-code responses, `/tmp` exhaustion, denied DNS lookups,
//! and corrupted response bodies.

pub mod adapters;
pub mod config;
pub mod denylist;
pub mod failures;
pub mod matching;
pub mod observability;
pub mod orchestrator;

pub use adapters::{wrap, BeforeOutcome, InjectionHooks, Wrapped};
pub use config::{Configuration, ConfigProvider, ConfigService, FailureMode};
pub use orchestrator::{reset, Context, HandlerError, InvocationError, Options, RollFn};
