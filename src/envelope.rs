//! The JSON document that carries a GraphQL operation over HTTP.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A GraphQL request body: document text, variables and operation name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationEnvelope {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Map<String, Value>>,
    #[serde(
        rename = "operationName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub operation_name: Option<String>,
}

impl OperationEnvelope {
    /// Read the `operationName` of an arbitrary JSON body, if it carries one.
    ///
    /// The proxy only uses this for logging; it never rejects bodies that are
    /// not shaped like an envelope.
    #[must_use]
    pub fn operation_name_of(body: &Value) -> Option<&str> {
        body.get("operationName").and_then(Value::as_str)
    }
}
