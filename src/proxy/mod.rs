//! Same-origin forwarding proxy for GraphQL operations.
//!
//! [`ForwardingProxy`] relays request bodies and query strings to a fixed
//! upstream and hands the upstream's answer back untouched. The only
//! responses it originates itself are `400` for bodies that are not JSON,
//! `200` debug echoes, and `500` when forwarding fails.

mod body;
pub mod server;
mod upstream;

use bytes::Bytes;
use log::{debug, error};
use serde_json::{Value, json};
use thiserror::Error;

use self::body::{InvalidBody, ParsedBody};
use crate::envelope::OperationEnvelope;
use crate::snippet::payload_snippet;

pub use self::server::{DEFAULT_BODY_LIMIT, ProxyServer, RunningServer};
pub use self::upstream::{Endpoint, HttpUpstream, Upstream, UpstreamResponse};


/// Request header that switches POST handling into debug mode when set to `1`.
pub const DEBUG_HEADER: &str = "x-debug";

/// Content type of every proxy-originated body and of upstream answers that
/// carry none.
pub const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("{context} failed: {source}")]
    Upstream {
        context: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to serialise request body: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to read request body: {0}")]
    ReadBody(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Whether a POST echoes what it received instead of forwarding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DebugMode {
    #[default]
    Off,
    On,
}

impl DebugMode {
    /// Interpret the value of the [`DEBUG_HEADER`] request header.
    #[must_use]
    pub fn from_header(value: Option<&str>) -> Self {
        if value == Some("1") { Self::On } else { Self::Off }
    }
}

/// Status, content type and body to send back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyResponse {
    pub status: u16,
    pub content_type: String,
    pub body: Bytes,
}

impl ProxyResponse {
    fn json(status: u16, body: &Value) -> Self {
        Self {
            status,
            content_type: JSON_CONTENT_TYPE.to_string(),
            body: Bytes::from(body.to_string()),
        }
    }

    fn passthrough(upstream: UpstreamResponse) -> Self {
        Self {
            status: upstream.status,
            content_type: upstream
                .content_type
                .unwrap_or_else(|| JSON_CONTENT_TYPE.to_string()),
            body: upstream.body,
        }
    }

    pub(crate) fn failure(err: &ProxyError) -> Self {
        Self::json(500, &json!({ "error": err.to_string() }))
    }

    fn invalid_json(body: InvalidBody, debug: DebugMode) -> Self {
        let payload = match debug {
            DebugMode::On => json!({ "error": "Invalid JSON", "rawBody": body.raw }),
            DebugMode::Off => json!({ "errors": [{ "message": "Invalid JSON body" }] }),
        };
        Self::json(400, &payload)
    }

    fn debug_echo(parsed: ParsedBody) -> Self {
        let mut echo = serde_json::Map::new();
        echo.insert("parsed".into(), parsed.value);
        if let Some(raw) = parsed.raw {
            echo.insert("rawBody".into(), Value::String(raw));
        }
        Self::json(200, &Value::Object(echo))
    }
}

/// Stateless relay between callers and one [`Upstream`].
#[derive(Debug, Clone)]
pub struct ForwardingProxy<U = HttpUpstream> {
    upstream: U,
}

impl<U: Upstream> ForwardingProxy<U> {
    pub fn new(upstream: U) -> Self {
        Self { upstream }
    }

    /// Handle a POSTed operation whose body has already been read once.
    pub async fn handle_post(&self, body: Bytes, debug: DebugMode) -> ProxyResponse {
        let parsed = match ParsedBody::parse(&body) {
            Ok(parsed) => parsed,
            Err(invalid) => {
                debug!("rejecting POST body that is not JSON ({} bytes)", body.len());
                return ProxyResponse::invalid_json(invalid, debug);
            }
        };
        if debug == DebugMode::On {
            return ProxyResponse::debug_echo(parsed);
        }
        match self.forward_post(&parsed.value).await {
            Ok(response) => response,
            Err(e) => {
                error!("forwarding POST failed: {e}");
                ProxyResponse::failure(&e)
            }
        }
    }

    /// Handle a GET, forwarding `query` (the raw query string) as is.
    ///
    /// Unlike POST there is no debug mode and nothing is validated.
    pub async fn handle_get(&self, query: Option<&str>) -> ProxyResponse {
        debug!("forwarding GET ({} byte query)", query.map_or(0, str::len));
        match self.upstream.get(query).await {
            Ok(upstream) => ProxyResponse::passthrough(upstream),
            Err(e) => {
                error!("forwarding GET failed: {e}");
                ProxyResponse::failure(&e)
            }
        }
    }

    async fn forward_post(&self, value: &Value) -> Result<ProxyResponse, ProxyError> {
        let body = serde_json::to_vec(value)?;
        debug!(
            "forwarding POST operation={} payload={}",
            OperationEnvelope::operation_name_of(value).unwrap_or("<anonymous>"),
            payload_snippet(value)
        );
        let upstream = self.upstream.post_json(Bytes::from(body)).await?;
        Ok(ProxyResponse::passthrough(upstream))
    }
}
