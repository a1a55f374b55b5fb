//! Failure primitives, one per mode.
//!
//! Each routine performs exactly one perturbation and logs one `inject`
//! record. Routines that touch the filesystem never re-raise — a broken
//! chaos tool must not become the outage it was meant to simulate.

pub mod corruption;
pub mod diskspace;
pub mod exception;
pub mod latency;
pub mod statuscode;
pub mod timeout;
