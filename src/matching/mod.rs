//! Event matching for targeted injection.
//!
//! Conditions address the invocation event by dotted path and compare with a
//! small operator set. All conditions must pass; an empty list matches every
//! event. A path that runs off the event, an uncompilable pattern, or any
//! other evaluation problem makes the condition false — targeting mistakes
//! must never fail an invocation.

use std::sync::OnceLock;

use dashmap::DashMap;
use regex::Regex;
use serde_json::Value;

use crate::config::schema::{MatchCondition, MatchOperator};

/// Resolve a dotted path against a nested JSON value. Returns `None` at the
/// first missing segment or non-object intermediate.
pub fn lookup_path<'a>(event: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = event;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// The string form values are compared through: strings raw, numbers and
/// booleans via display, everything else as serialized JSON.
fn string_form(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Compiled patterns, cached per source for the container's lifetime.
fn cached_regex(pattern: &str) -> Option<Regex> {
    static CACHE: OnceLock<DashMap<String, Regex>> = OnceLock::new();
    let cache = CACHE.get_or_init(DashMap::new);

    if let Some(re) = cache.get(pattern) {
        return Some(re.value().clone());
    }
    match Regex::new(pattern) {
        Ok(re) => {
            cache.insert(pattern.to_string(), re.clone());
            Some(re)
        }
        Err(_) => None,
    }
}

fn condition_matches(event: &Value, condition: &MatchCondition) -> bool {
    let actual = lookup_path(event, &condition.path);
    let expected = condition.value.as_deref().unwrap_or("");

    match condition.operator() {
        MatchOperator::Exists => actual.is_some_and(|v| !v.is_null()),
        MatchOperator::Eq => match actual {
            Some(v) if !v.is_null() => string_form(v) == expected,
            _ => false,
        },
        MatchOperator::StartsWith => match actual {
            Some(v) if !v.is_null() => string_form(v).starts_with(expected),
            _ => false,
        },
        MatchOperator::Regex => match actual {
            Some(v) if !v.is_null() => match cached_regex(expected) {
                Some(re) => re.is_match(&string_form(v)),
                None => false,
            },
            _ => false,
        },
    }
}

/// Whether the event satisfies every condition. Comparison is case-sensitive.
pub fn matches(event: &Value, conditions: &[MatchCondition]) -> bool {
    conditions.iter().all(|c| condition_matches(event, c))
}
