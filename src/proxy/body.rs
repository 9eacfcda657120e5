//! Parsing of POSTed request bodies.

use serde_json::Value;

/// A request body that parsed as JSON.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ParsedBody {
    pub(crate) value: Value,
    /// The body text, kept only when the lenient second parse was needed.
    pub(crate) raw: Option<String>,
}

/// A request body that is not JSON under either parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InvalidBody {
    pub(crate) raw: String,
}

impl ParsedBody {
    /// Parse bytes that were read from the request exactly once.
    ///
    /// The strict parse reads the bytes as they are. If it fails, the bytes
    /// are decoded as lossy UTF-8 with a leading byte-order mark removed and
    /// parsed again.
    pub(crate) fn parse(bytes: &[u8]) -> Result<Self, InvalidBody> {
        if let Ok(value) = serde_json::from_slice::<Value>(bytes) {
            return Ok(Self { value, raw: None });
        }
        let text = String::from_utf8_lossy(bytes).into_owned();
        let lenient = text.strip_prefix('\u{feff}').unwrap_or(&text);
        match serde_json::from_str::<Value>(lenient) {
            Ok(value) => Ok(Self {
                value,
                raw: Some(text),
            }),
            Err(_) => Err(InvalidBody { raw: text }),
        }
    }
}
