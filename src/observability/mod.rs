//! Structured logging for the injection pipeline.

pub mod logging;

pub use logging::SOURCE;
