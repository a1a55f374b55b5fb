//! Response-body corruption.
//!
//! With a replacement configured the body is substituted wholesale.
//! Without one the original body is mangled: truncated at a random point
//! and terminated with replacement characters, the shape of a response cut
//! off mid-transfer.

use rand::Rng;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::observability::SOURCE;

/// Appended to every mangled body.
const REPLACEMENT_SUFFIX: &str = "\u{FFFD}\u{FFFD}\u{FFFD}";

/// A handler result, classified by whether it carries a `body` field.
enum ResponseShape {
    /// An object with a `body` entry; the map holds the full object.
    HasBody(Map<String, Value>),
    /// Anything else, returned as-is on paths that cannot corrupt it.
    Bodyless(Value),
}

fn classify(result: Value) -> ResponseShape {
    match result {
        Value::Object(map) if map.contains_key("body") => ResponseShape::HasBody(map),
        other => ResponseShape::Bodyless(other),
    }
}

/// Corrupt a handler result.
///
/// `body_override` set: an object result gets a shallow copy with `body`
/// replaced; a result without a `body` field becomes `{ "body": override }`
/// with a warning. Unset: a string `body` is mangled in place; anything else
/// warns and passes through unchanged.
pub fn corrupt(body_override: Option<&str>, result: Value) -> Value {
    match body_override {
        Some(replacement) => {
            info!(
                source = SOURCE,
                mode = "corruption",
                action = "inject",
                method = "replace",
            );
            match classify(result) {
                ResponseShape::HasBody(mut map) => {
                    map.insert("body".into(), Value::String(replacement.to_string()));
                    Value::Object(map)
                }
                ResponseShape::Bodyless(_) => {
                    warn!(
                        source = SOURCE,
                        mode = "corruption",
                        action = "error",
                        message = "response has no body field; wrapping in {{ body }}",
                    );
                    json!({ "body": replacement })
                }
            }
        }
        None => {
            info!(
                source = SOURCE,
                mode = "corruption",
                action = "inject",
                method = "mangle",
            );
            match classify(result) {
                ResponseShape::HasBody(mut map) => match map.get("body") {
                    Some(Value::String(body)) => {
                        let mangled = mangle(body);
                        map.insert("body".into(), Value::String(mangled));
                        Value::Object(map)
                    }
                    _ => {
                        warn!(
                            source = SOURCE,
                            mode = "corruption",
                            action = "error",
                            message = "response body is not a string; returning unchanged",
                        );
                        Value::Object(map)
                    }
                },
                ResponseShape::Bodyless(other) => {
                    warn!(
                        source = SOURCE,
                        mode = "corruption",
                        action = "error",
                        message = "response has no string body field to mangle; returning unchanged",
                    );
                    other
                }
            }
        }
    }
}

/// Truncate at a uniform point between 30% and 80% of the input's length
/// (snapped back to a char boundary) and append the replacement suffix.
fn mangle(input: &str) -> String {
    if input.is_empty() {
        return input.to_string();
    }
    let fraction = 0.3 + rand::thread_rng().gen::<f64>() * 0.5;
    let cut = (input.len() as f64 * fraction).floor() as usize;
    let safe_cut = input
        .char_indices()
        .take_while(|&(i, _)| i <= cut)
        .last()
        .map(|(i, _)| i)
        .unwrap_or(0);

    let mut result = input[..safe_cut].to_string();
    result.push_str(REPLACEMENT_SUFFIX);
    result
}
