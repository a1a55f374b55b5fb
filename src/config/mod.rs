//! Configuration subsystem.
//!
//! # Data Flow
//! ```text
//! remote document (AppConfig extension / SSM parameter)
//!     → loader.rs (backend selection & transport)
//!     → validation.rs (field-level checks, fail-closed parse)
//!     → schema.rs (typed Configuration)
//!     → cache.rs (TTL-bounded, container-scoped)
//!     → resolve_failures (enabled flags, execution order)
//! ```
//!
//! # Design Decisions
//! - Validation is fail-closed: a flag with any field error is dropped whole
//! - Regex sources are structurally screened before compilation
//! - Loading never fails the invocation; errors degrade to the empty config

pub mod cache;
pub mod loader;
pub mod redos;
pub mod schema;
pub mod validation;

pub use loader::{ConfigFetcher, ConfigProvider, ConfigService};
pub use schema::{
    resolve_failures, Configuration, FailureFlag, FailureMode, FailurePayload, MatchCondition,
    MatchOperator, ResolvedFailure,
};
pub use validation::{parse_flags, validate_flag_value, FieldError};
