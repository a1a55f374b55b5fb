//! Field-level flag validation and fail-closed parsing.
//!
//! Validation runs against the raw JSON object so every violation can report
//! the offending field and value. A flag with any error is dropped from the
//! parsed configuration entirely — a half-applied failure mode is worse than
//! no failure mode.

use serde_json::{Map, Value};
use tracing::warn;

use crate::config::redos;
use crate::config::schema::{
    Configuration, FailureFlag, FailureMode, FailurePayload, MatchCondition,
};
use crate::observability::SOURCE;

const VALID_OPERATORS: [&str; 4] = ["eq", "exists", "startsWith", "regex"];

/// A single validation failure, naming the field and the offending value.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
    pub value: Value,
}

impl FieldError {
    fn new(field: String, message: &str, value: Option<&Value>) -> Self {
        Self {
            field,
            message: message.to_string(),
            value: value.cloned().unwrap_or(Value::Null),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate one raw flag object against the rules for `mode`.
///
/// Returns every violation found; an empty list means the flag is accepted.
/// A missing optional field is never an error.
pub fn validate_flag_value(mode: FailureMode, raw: &Map<String, Value>) -> Vec<FieldError> {
    let mut errors = Vec::new();
    let field = |name: &str| format!("{mode}.{name}");

    match raw.get("enabled") {
        Some(Value::Bool(_)) => {}
        other => errors.push(FieldError::new(
            field("enabled"),
            "must be a boolean",
            other,
        )),
    }

    if let Some(pct) = raw.get("percentage") {
        match pct.as_u64() {
            Some(n) if n <= 100 => {}
            _ => errors.push(FieldError::new(
                field("percentage"),
                "must be an integer between 0 and 100",
                Some(pct),
            )),
        }
    }

    match mode {
        FailureMode::Latency => {
            for name in ["min_latency", "max_latency"] {
                if let Some(v) = raw.get(name) {
                    if !is_non_negative_number(v) {
                        errors.push(FieldError::new(
                            field(name),
                            "must be a non-negative number",
                            Some(v),
                        ));
                    }
                }
            }
            if let (Some(min), Some(max)) = (
                raw.get("min_latency").and_then(Value::as_f64),
                raw.get("max_latency").and_then(Value::as_f64),
            ) {
                if min > max {
                    errors.push(FieldError::new(
                        field("max_latency"),
                        "max_latency must be >= min_latency",
                        raw.get("max_latency"),
                    ));
                }
            }
        }
        FailureMode::Timeout => {
            if let Some(v) = raw.get("timeout_buffer_ms") {
                if !is_non_negative_number(v) {
                    errors.push(FieldError::new(
                        field("timeout_buffer_ms"),
                        "must be a non-negative number",
                        Some(v),
                    ));
                }
            }
        }
        FailureMode::Exception => {
            if let Some(v) = raw.get("exception_msg") {
                if !v.is_string() && !v.is_null() {
                    errors.push(FieldError::new(
                        field("exception_msg"),
                        "must be a string",
                        Some(v),
                    ));
                }
            }
        }
        FailureMode::Statuscode => {
            if let Some(v) = raw.get("status_code") {
                match v.as_u64() {
                    Some(code) if (100..=599).contains(&code) => {}
                    _ => errors.push(FieldError::new(
                        field("status_code"),
                        "must be an HTTP status code (100-599)",
                        Some(v),
                    )),
                }
            }
        }
        FailureMode::Diskspace => {
            if let Some(v) = raw.get("disk_space") {
                match v.as_u64() {
                    Some(mb) if (1..=10240).contains(&mb) => {}
                    _ => errors.push(FieldError::new(
                        field("disk_space"),
                        "must be between 1 and 10240 (MB)",
                        Some(v),
                    )),
                }
            }
        }
        FailureMode::Denylist => {
            if let Some(v) = raw.get("deny_list") {
                match v.as_array() {
                    Some(patterns) => {
                        for (i, pattern) in patterns.iter().enumerate() {
                            validate_pattern(
                                &format!("{mode}.deny_list[{i}]"),
                                pattern,
                                &mut errors,
                            );
                        }
                    }
                    None => errors.push(FieldError::new(
                        field("deny_list"),
                        "must be a list of strings",
                        Some(v),
                    )),
                }
            }
        }
        FailureMode::Corruption => {
            if let Some(v) = raw.get("body") {
                if !v.is_string() && !v.is_null() {
                    errors.push(FieldError::new(field("body"), "must be a string", Some(v)));
                }
            }
        }
    }

    if let Some(v) = raw.get("match") {
        validate_conditions(mode, v, &mut errors);
    }

    errors
}

fn is_non_negative_number(v: &Value) -> bool {
    v.as_f64().is_some_and(|n| n >= 0.0)
}

fn validate_pattern(field: &str, value: &Value, errors: &mut Vec<FieldError>) {
    let Some(source) = value.as_str() else {
        errors.push(FieldError::new(
            field.to_string(),
            "must be a string",
            Some(value),
        ));
        return;
    };
    if let Err(e) = redos::screen(source) {
        errors.push(FieldError::new(field.to_string(), &e.to_string(), Some(value)));
        return;
    }
    if regex::Regex::new(source).is_err() {
        errors.push(FieldError::new(
            field.to_string(),
            "invalid regular expression",
            Some(value),
        ));
    }
}

fn validate_conditions(mode: FailureMode, raw: &Value, errors: &mut Vec<FieldError>) {
    let Some(list) = raw.as_array() else {
        errors.push(FieldError::new(
            format!("{mode}.match"),
            "must be a list",
            Some(raw),
        ));
        return;
    };

    for (i, entry) in list.iter().enumerate() {
        let field = |name: &str| format!("{mode}.match[{i}].{name}");
        let Some(cond) = entry.as_object() else {
            errors.push(FieldError::new(
                format!("{mode}.match[{i}]"),
                "must be an object",
                Some(entry),
            ));
            continue;
        };

        match cond.get("path").and_then(Value::as_str) {
            Some(path) if !path.is_empty() => {}
            _ => errors.push(FieldError::new(
                field("path"),
                "must be a non-empty string",
                cond.get("path"),
            )),
        }

        let operator = match cond.get("operator") {
            None | Some(Value::Null) => "eq",
            Some(Value::String(op)) if VALID_OPERATORS.contains(&op.as_str()) => op.as_str(),
            other => {
                errors.push(FieldError::new(
                    field("operator"),
                    "must be one of: eq, exists, startsWith, regex",
                    other,
                ));
                continue;
            }
        };

        match cond.get("value") {
            Some(Value::String(value)) => {
                if operator == "regex" {
                    validate_pattern(&field("value"), &Value::String(value.clone()), errors);
                }
            }
            None | Some(Value::Null) if operator == "exists" => {}
            other => errors.push(FieldError::new(
                field("value"),
                "must be a string (required for all operators except 'exists')",
                other,
            )),
        }
    }
}

/// Parse a raw configuration document into the typed model.
///
/// Unknown keys are ignored. Recognized flags that fail validation are
/// dropped with one warning per field error plus a summary. A document in the
/// legacy 0.x format (`isEnabled`/`failureMode` at the root) yields an empty
/// configuration.
pub fn parse_flags(raw: &Value) -> Configuration {
    let Some(obj) = raw.as_object() else {
        warn!(
            source = SOURCE,
            action = "config",
            message = "config is not a JSON object",
        );
        return Configuration::new();
    };

    if obj.contains_key("isEnabled") || obj.contains_key("failureMode") {
        warn!(
            source = SOURCE,
            action = "config",
            message = "detected 0.x configuration format — see the migration notes for the v1.0 feature-flag format",
        );
        return Configuration::new();
    }

    let mut config = Configuration::new();

    for (key, value) in obj {
        let Some(mode) = FailureMode::from_key(key) else {
            continue;
        };

        let Some(flag_obj) = value.as_object() else {
            warn!(
                source = SOURCE,
                action = "config",
                mode = %mode,
                message = "must be an object, skipping",
            );
            continue;
        };

        let errors = validate_flag_value(mode, flag_obj);
        if !errors.is_empty() {
            for err in &errors {
                warn!(
                    source = SOURCE,
                    action = "config",
                    field = %err.field,
                    value = %err.value,
                    message = %err.message,
                );
            }
            warn!(
                source = SOURCE,
                action = "config",
                mode = %mode,
                message = "skipping flag due to validation errors",
            );
            continue;
        }

        config.insert(build_flag(mode, flag_obj));
    }

    config
}

/// Convert a validated raw flag object into the typed model, applying
/// defaults (percentage 100, latency bounds 0, timeout buffer 0).
fn build_flag(mode: FailureMode, raw: &Map<String, Value>) -> FailureFlag {
    let enabled = raw.get("enabled").and_then(Value::as_bool).unwrap_or(false);
    let percentage = raw
        .get("percentage")
        .and_then(Value::as_u64)
        .unwrap_or(100) as u8;
    let conditions: Vec<MatchCondition> = raw
        .get("match")
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default();

    let ms = |name: &str| raw.get(name).and_then(Value::as_f64).map(|v| v as u64);

    let payload = match mode {
        FailureMode::Latency => {
            let min_ms = ms("min_latency").unwrap_or(0);
            // An absent upper bound degenerates to the lower one.
            let max_ms = ms("max_latency").unwrap_or(min_ms);
            FailurePayload::Latency { min_ms, max_ms }
        }
        FailureMode::Timeout => FailurePayload::Timeout {
            buffer_ms: ms("timeout_buffer_ms").unwrap_or(0),
        },
        FailureMode::Exception => FailurePayload::Exception {
            message: raw
                .get("exception_msg")
                .and_then(Value::as_str)
                .map(String::from),
        },
        FailureMode::Statuscode => FailurePayload::Statuscode {
            code: raw
                .get("status_code")
                .and_then(Value::as_u64)
                .map(|c| c as u16),
        },
        FailureMode::Diskspace => FailurePayload::Diskspace {
            megabytes: raw
                .get("disk_space")
                .and_then(Value::as_u64)
                .map(|mb| mb as u32),
        },
        FailureMode::Denylist => FailurePayload::Denylist {
            patterns: raw
                .get("deny_list")
                .and_then(Value::as_array)
                .map(|list| {
                    list.iter()
                        .filter_map(Value::as_str)
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
        },
        FailureMode::Corruption => FailurePayload::Corruption {
            body: raw.get("body").and_then(Value::as_str).map(String::from),
        },
    };

    FailureFlag {
        enabled,
        percentage,
        conditions,
        payload,
    }
}
