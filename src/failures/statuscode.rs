//! Substituted status-code responses.

use serde_json::{json, Value};
use tracing::info;

use crate::observability::SOURCE;

/// Code used when the flag carries none.
pub const DEFAULT_STATUS_CODE: u16 = 500;

/// Build the short-circuit response: a well-formed HTTP response object with
/// the injected code and a JSON body naming it.
pub fn build(code: Option<u16>) -> Value {
    let status_code = code.unwrap_or(DEFAULT_STATUS_CODE);

    info!(
        source = SOURCE,
        mode = "statuscode",
        action = "inject",
        status_code = status_code,
    );

    json!({
        "statusCode": status_code,
        "headers": { "Content-Type": "application/json" },
        "body": format!("{{\"message\":\"Injected status code {status_code}\"}}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_response_with_configured_code() {
        let response = build(Some(503));
        assert_eq!(response["statusCode"], 503);
        assert!(response["headers"]["Content-Type"]
            .as_str()
            .unwrap()
            .contains("json"));
        assert!(response["body"].as_str().unwrap().contains("503"));
    }

    #[test]
    fn defaults_to_500() {
        assert_eq!(build(None)["statusCode"], 500);
    }
}
