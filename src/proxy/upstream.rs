//! The GraphQL service the proxy forwards to.

use bytes::Bytes;
use log::debug;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::redirect::Policy;
use std::future::Future;

use super::ProxyError;
use crate::swapi::SWAPI_GRAPHQL_URL;
use crate::{HolonetError, USER_AGENT};

const MAX_REDIRECTS: usize = 10;

/// Location of the upstream GraphQL endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint(String);

impl Endpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The endpoint with `query` appended verbatim after a `?`.
    #[must_use]
    pub fn with_query(&self, query: Option<&str>) -> String {
        match query.filter(|q| !q.is_empty()) {
            Some(q) => format!("{}?{q}", self.0),
            None => self.0.clone(),
        }
    }
}

impl From<&str> for Endpoint {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Endpoint {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self(SWAPI_GRAPHQL_URL.to_string())
    }
}

/// What the upstream answered, untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// Outbound side of the proxy.
///
/// Each call is one HTTP exchange; implementations never retry.
pub trait Upstream: Send + Sync + 'static {
    /// POST a JSON body.
    fn post_json(
        &self,
        body: Bytes,
    ) -> impl Future<Output = Result<UpstreamResponse, ProxyError>> + Send;

    /// GET with `query` appended to the endpoint as is.
    fn get(
        &self,
        query: Option<&str>,
    ) -> impl Future<Output = Result<UpstreamResponse, ProxyError>> + Send;
}

/// [`Upstream`] over HTTP, following redirects.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
    endpoint: Endpoint,
}

impl HttpUpstream {
    /// # Errors
    ///
    /// Returns [`HolonetError::HttpClient`] if the HTTP client cannot be
    /// constructed.
    pub fn new(endpoint: impl Into<Endpoint>) -> Result<Self, HolonetError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    async fn collect(response: reqwest::Response) -> Result<UpstreamResponse, ProxyError> {
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = response
            .bytes()
            .await
            .map_err(|source| ProxyError::Upstream {
                context: "reading upstream response",
                source,
            })?;
        debug!("upstream answered {status} with {} bytes", body.len());
        Ok(UpstreamResponse {
            status,
            content_type,
            body,
        })
    }
}

impl Upstream for HttpUpstream {
    async fn post_json(&self, body: Bytes) -> Result<UpstreamResponse, ProxyError> {
        let response = self
            .client
            .post(self.endpoint.as_str())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|source| ProxyError::Upstream {
                context: "POST to upstream",
                source,
            })?;
        Self::collect(response).await
    }

    async fn get(&self, query: Option<&str>) -> Result<UpstreamResponse, ProxyError> {
        let response = self
            .client
            .get(self.endpoint.with_query(query))
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|source| ProxyError::Upstream {
                context: "GET from upstream",
                source,
            })?;
        Self::collect(response).await
    }
}
