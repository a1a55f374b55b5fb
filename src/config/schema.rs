//! Typed failure-flag model.
//!
//! The wire format is a JSON object mapping mode names to flag objects.
//! Internally each flag is a discriminated variant carrying only the fields
//! relevant to its mode, keyed by [`FailureMode`] in a `BTreeMap` — the key's
//! ordering *is* the execution order, and the map makes "at most one entry
//! per mode" structural.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// The supported failure modes, declared in execution order.
///
/// Non-terminating perturbations run first so they stay observable even when
/// a later mode short-circuits the handler; `Statuscode` precedes `Exception`
/// because the two would otherwise mask each other; `Corruption` is the only
/// post-handler mode and sorts last.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum FailureMode {
    Latency,
    Timeout,
    Diskspace,
    Denylist,
    Statuscode,
    Exception,
    Corruption,
}

impl FailureMode {
    /// All modes, in execution order.
    pub const ALL: [FailureMode; 7] = [
        FailureMode::Latency,
        FailureMode::Timeout,
        FailureMode::Diskspace,
        FailureMode::Denylist,
        FailureMode::Statuscode,
        FailureMode::Exception,
        FailureMode::Corruption,
    ];

    /// The mode's wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureMode::Latency => "latency",
            FailureMode::Timeout => "timeout",
            FailureMode::Diskspace => "diskspace",
            FailureMode::Denylist => "denylist",
            FailureMode::Statuscode => "statuscode",
            FailureMode::Exception => "exception",
            FailureMode::Corruption => "corruption",
        }
    }

    /// Look up a mode by its wire name. Unknown keys resolve to `None`.
    pub fn from_key(key: &str) -> Option<FailureMode> {
        FailureMode::ALL.iter().copied().find(|m| m.as_str() == key)
    }
}

impl std::fmt::Display for FailureMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Match operators for event-based targeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum MatchOperator {
    #[default]
    Eq,
    Exists,
    StartsWith,
    Regex,
}

impl MatchOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchOperator::Eq => "eq",
            MatchOperator::Exists => "exists",
            MatchOperator::StartsWith => "startsWith",
            MatchOperator::Regex => "regex",
        }
    }
}

/// One condition of a flag's `match` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCondition {
    /// Dotted path into the invocation event.
    pub path: String,
    /// Comparison value. Required for every operator except `exists`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Operator; `eq` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<MatchOperator>,
}

impl MatchCondition {
    /// The effective operator, with the `eq` default applied.
    pub fn operator(&self) -> MatchOperator {
        self.operator.unwrap_or_default()
    }
}

/// Mode-specific flag payload.
#[derive(Debug, Clone, PartialEq)]
pub enum FailurePayload {
    /// Sleep uniformly in `[min_ms, max_ms]`.
    Latency { min_ms: u64, max_ms: u64 },
    /// Sleep until `buffer_ms` before the invocation deadline.
    Timeout { buffer_ms: u64 },
    /// Fail the invocation with the given message.
    Exception { message: Option<String> },
    /// Short-circuit with an HTTP response carrying this status code.
    Statuscode { code: Option<u16> },
    /// Write this many MiB of zeros under `/tmp`.
    Diskspace { megabytes: Option<u32> },
    /// Deny host resolution for hostnames matching any pattern.
    Denylist { patterns: Vec<String> },
    /// Replace or mangle the response body.
    Corruption { body: Option<String> },
}

impl FailurePayload {
    /// The mode this payload belongs to.
    pub fn mode(&self) -> FailureMode {
        match self {
            FailurePayload::Latency { .. } => FailureMode::Latency,
            FailurePayload::Timeout { .. } => FailureMode::Timeout,
            FailurePayload::Exception { .. } => FailureMode::Exception,
            FailurePayload::Statuscode { .. } => FailureMode::Statuscode,
            FailurePayload::Diskspace { .. } => FailureMode::Diskspace,
            FailurePayload::Denylist { .. } => FailureMode::Denylist,
            FailurePayload::Corruption { .. } => FailureMode::Corruption,
        }
    }
}

/// A single validated failure flag.
#[derive(Debug, Clone, PartialEq)]
pub struct FailureFlag {
    /// Whether the flag is active.
    pub enabled: bool,
    /// Injection probability, stored clamped to `0..=100`.
    pub percentage: u8,
    /// Event-match conditions; an empty list matches every event.
    pub conditions: Vec<MatchCondition>,
    /// Mode-specific fields.
    pub payload: FailurePayload,
}

impl FailureFlag {
    pub fn mode(&self) -> FailureMode {
        self.payload.mode()
    }

    /// Serialize to the wire flag object.
    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("enabled".into(), Value::Bool(self.enabled));
        obj.insert("percentage".into(), json!(self.percentage));
        match &self.payload {
            FailurePayload::Latency { min_ms, max_ms } => {
                obj.insert("min_latency".into(), json!(min_ms));
                obj.insert("max_latency".into(), json!(max_ms));
            }
            FailurePayload::Timeout { buffer_ms } => {
                obj.insert("timeout_buffer_ms".into(), json!(buffer_ms));
            }
            FailurePayload::Exception { message } => {
                if let Some(message) = message {
                    obj.insert("exception_msg".into(), json!(message));
                }
            }
            FailurePayload::Statuscode { code } => {
                if let Some(code) = code {
                    obj.insert("status_code".into(), json!(code));
                }
            }
            FailurePayload::Diskspace { megabytes } => {
                if let Some(megabytes) = megabytes {
                    obj.insert("disk_space".into(), json!(megabytes));
                }
            }
            FailurePayload::Denylist { patterns } => {
                obj.insert("deny_list".into(), json!(patterns));
            }
            FailurePayload::Corruption { body } => {
                if let Some(body) = body {
                    obj.insert("body".into(), json!(body));
                }
            }
        }
        if !self.conditions.is_empty() {
            obj.insert(
                "match".into(),
                serde_json::to_value(&self.conditions).unwrap_or(Value::Null),
            );
        }
        Value::Object(obj)
    }
}

/// A validated configuration: at most one flag per mode, iterated in
/// execution order regardless of key order in the source document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Configuration {
    flags: BTreeMap<FailureMode, FailureFlag>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn get(&self, mode: FailureMode) -> Option<&FailureFlag> {
        self.flags.get(&mode)
    }

    /// Insert a flag under its payload's mode, replacing any existing entry.
    pub fn insert(&mut self, flag: FailureFlag) {
        self.flags.insert(flag.mode(), flag);
    }

    /// Flags in execution order.
    pub fn iter(&self) -> impl Iterator<Item = (&FailureMode, &FailureFlag)> {
        self.flags.iter()
    }

    /// Names of the enabled modes, in execution order.
    pub fn enabled_modes(&self) -> Vec<&'static str> {
        self.flags
            .iter()
            .filter(|(_, f)| f.enabled)
            .map(|(m, _)| m.as_str())
            .collect()
    }

    /// Serialize to the wire document. Feeding the result back through
    /// [`parse_flags`](crate::config::validation::parse_flags) yields an
    /// identical configuration.
    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        for (mode, flag) in &self.flags {
            obj.insert(mode.as_str().to_string(), flag.to_value());
        }
        Value::Object(obj)
    }
}

impl Serialize for Configuration {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// A failure resolved from an enabled flag, ready to inject.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFailure {
    pub mode: FailureMode,
    /// Clamped to `0..=100`.
    pub percentage: u8,
    pub flag: FailureFlag,
}

/// Filter a configuration to its enabled flags and emit them in execution
/// order, clamping each percentage to `0..=100`.
pub fn resolve_failures(config: &Configuration) -> Vec<ResolvedFailure> {
    config
        .iter()
        .filter(|(_, flag)| flag.enabled)
        .map(|(mode, flag)| ResolvedFailure {
            mode: *mode,
            percentage: flag.percentage.min(100),
            flag: flag.clone(),
        })
        .collect()
}
