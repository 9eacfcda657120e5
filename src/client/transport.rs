//! Sending operations to the proxy and interpreting what comes back.

use bytes::Bytes;
use log::debug;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::future::Future;
use thiserror::Error;
use url::Url;

use super::operation::{Operation, OperationKind};
use super::result::{Failure, FailureKind};
use crate::snippet::{BODY_SNIPPET_LEN, snippet};
use crate::{HolonetError, USER_AGENT};

/// Raw HTTP answer to an operation.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Bytes,
}

#[derive(Error, Debug)]
#[error("request to {endpoint} failed: {source}")]
pub struct TransportError {
    endpoint: String,
    #[source]
    source: reqwest::Error,
}

impl TransportError {
    pub(crate) fn new(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        Self {
            endpoint: endpoint.into(),
            source,
        }
    }
}

/// Delivers an operation and returns the raw response.
///
/// [`HttpTransport`] is the production implementation; tests substitute
/// scripted ones.
pub trait Transport: Send + Sync + 'static {
    fn send(
        &self,
        operation: &Operation,
    ) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send;
}

/// Speaks GraphQL-over-HTTP to a single endpoint.
///
/// Queries use GET with `query`, `operationName` and `variables` URL
/// parameters so intermediaries may cache them; everything else is POSTed as
/// a JSON envelope.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: Url,
    get_for_queries: bool,
}

impl HttpTransport {
    /// Create a transport for `endpoint`, e.g. `http://127.0.0.1:3000/proxy`.
    ///
    /// # Errors
    ///
    /// Returns [`HolonetError::HttpClient`] if the HTTP client cannot be
    /// constructed.
    pub fn new(endpoint: Url) -> Result<Self, HolonetError> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            endpoint,
            get_for_queries: true,
        })
    }

    /// Choose how queries travel: `true` (the default) sends them as GET
    /// with URL parameters, `false` POSTs them as a JSON envelope like every
    /// other operation.
    #[must_use]
    pub fn use_get_for_queries(mut self, enabled: bool) -> Self {
        self.get_for_queries = enabled;
        self
    }

    fn query_url(&self, operation: &Operation) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("query", operation.document());
            if let Some(name) = operation.name() {
                pairs.append_pair("operationName", name);
            }
            if !operation.variables().is_empty() {
                let variables = Value::Object(operation.variables().clone()).to_string();
                pairs.append_pair("variables", &variables);
            }
        }
        url
    }

    fn request_error(&self, source: reqwest::Error) -> TransportError {
        TransportError::new(self.endpoint.as_str(), source)
    }
}

impl Transport for HttpTransport {
    async fn send(&self, operation: &Operation) -> Result<TransportResponse, TransportError> {
        let request = if operation.kind() == OperationKind::Query && self.get_for_queries {
            debug!("GET {} operation={}", self.endpoint, operation.label());
            self.client.get(self.query_url(operation))
        } else {
            debug!("POST {} operation={}", self.endpoint, operation.label());
            self.client
                .post(self.endpoint.clone())
                .json(&operation.envelope())
        };
        let response = request
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| self.request_error(e))?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| self.request_error(e))?;
        Ok(TransportResponse { status, body })
    }
}

#[derive(Debug, Deserialize)]
struct GraphQLResponse {
    data: Option<Value>,
    errors: Option<Vec<GraphQLError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQLError {
    message: String,
}

/// Turn a raw response into the root fields of its `data`.
///
/// Non-2xx statuses, undecodable bodies, GraphQL errors and missing data are
/// all failures; partial data alongside errors is discarded.
pub(crate) fn interpret(response: &TransportResponse) -> Result<Map<String, Value>, Failure> {
    let status = response.status;
    let body_snippet = || snippet(&String::from_utf8_lossy(&response.body), BODY_SNIPPET_LEN);
    if !(200..300).contains(&status) {
        return Err(Failure::new(
            FailureKind::Http { status },
            format!("body snippet: {}", body_snippet()),
        ));
    }
    let parsed: GraphQLResponse = serde_json::from_slice(&response.body).map_err(|e| {
        Failure::new(
            FailureKind::Decode,
            format!("{e}; snippet: {}", body_snippet()),
        )
    })?;
    if let Some(errors) = parsed.errors.filter(|errors| !errors.is_empty()) {
        let messages = errors
            .into_iter()
            .map(|e| e.message)
            .collect::<Vec<_>>()
            .join(", ");
        return Err(Failure::new(FailureKind::GraphQl, messages));
    }
    match parsed.data {
        Some(Value::Object(data)) => Ok(data),
        Some(other) => Err(Failure::new(
            FailureKind::Decode,
            format!("expected data to be an object, found {other}"),
        )),
        None => Err(Failure::new(
            FailureKind::EmptyResponse,
            format!("status {status}; snippet: {}", body_snippet()),
        )),
    }
}
