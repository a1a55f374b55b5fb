//! Integration surfaces.
//!
//! Two ways into the same pipeline: [`wrap`] takes the user handler directly
//! and returns a wrapped one; [`InjectionHooks`] exposes the pipeline as
//! before/after/on-error hooks for middleware stacks that own the handler
//! call themselves.

pub mod hooks;
pub mod wrap;

pub use hooks::{BeforeOutcome, InjectionHooks};
pub use wrap::{wrap, Wrapped};
