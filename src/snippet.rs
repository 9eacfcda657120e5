//! Truncation and redaction helpers for log and error output.

use log::warn;
use serde_json::Value;

/// Maximum number of characters kept from a response body in messages.
pub(crate) const BODY_SNIPPET_LEN: usize = 500;
/// Maximum number of characters kept from a redacted request payload.
pub(crate) const REQUEST_SNIPPET_LEN: usize = 1024;

/// Trim `text` to `max` characters, appending `...` when truncated.
///
/// Returns an empty string when `max` is zero.
pub(crate) fn snippet(text: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let mut out = text.chars().take(max).collect::<String>();
        out.push_str("...");
        out
    }
}

fn is_sensitive(key: &str) -> bool {
    matches!(
        key.to_ascii_lowercase().as_str(),
        "token"
            | "authorization"
            | "password"
            | "secret"
            | "access_token"
            | "refresh_token"
            | "api_key"
            | "apikey"
            | "credentials"
            | "private_key"
    )
}

fn redact_sensitive(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (k, v) in map.iter_mut() {
                if is_sensitive(k) {
                    *v = Value::String("<redacted>".into());
                } else {
                    redact_sensitive(v);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact_sensitive),
        _ => {}
    }
}

/// Render a redacted, truncated view of an operation payload for logging.
pub(crate) fn payload_snippet(payload: &Value) -> String {
    let mut redacted = payload.clone();
    redact_sensitive(&mut redacted);
    let json = match serde_json::to_string(&redacted) {
        Ok(s) => s,
        Err(e) => {
            warn!("failed to serialise redacted payload: {e}");
            "<failed to serialise payload>".into()
        }
    };
    snippet(&json, REQUEST_SNIPPET_LEN)
}

#[cfg(test)]
mod tests {
    use super::{payload_snippet, snippet};
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("", 3, "")]
    #[case("abc", 0, "")]
    #[case("abc", 3, "abc")]
    #[case("abcd", 3, "abc...")]
    #[case("ÆØÅ!", 3, "ÆØÅ...")]
    fn snippet_cases(#[case] text: &str, #[case] max: usize, #[case] expected: &str) {
        assert_eq!(snippet(text, max), expected);
    }

    #[test]
    fn payload_snippet_redacts_nested_variables() {
        let payload = json!({
            "query": "query Person($id: ID!) { person(id: $id) { name } }",
            "variables": {
                "id": "cGVvcGxlOjE=",
                "auth": { "password": "hunter2", "api_key": "k-123" },
                "tokens": [{ "token": "t-456" }]
            }
        });
        let snip = payload_snippet(&payload);
        assert!(snip.contains("cGVvcGxlOjE="));
        assert!(!snip.contains("hunter2"));
        assert!(!snip.contains("k-123"));
        assert!(!snip.contains("t-456"));
        assert!(snip.contains("<redacted>"));
    }
}
