//! Caching GraphQL query client.
//!
//! [`QueryClient`] sends operations through a [`Transport`], stores results
//! in an [`InMemoryCache`] and lets callers watch a query through an
//! [`ObservableQuery`]. Paginated fields accumulate pages according to their
//! [`FieldPolicy`].

mod cache;
mod cell;
mod connection;
mod observable;
mod operation;
mod result;
mod transport;

use log::{debug, warn};
use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError};
use url::Url;

use crate::HolonetError;

pub use self::cache::{FieldPolicy, InMemoryCache, KeyArgs, MergeFn, TypePolicies, WriteMode};
pub use self::cell::ClientCell;
pub use self::connection::{Connection, Edge, PageInfo, merge_connection};
pub use self::observable::ObservableQuery;
pub use self::operation::{Operation, OperationKind};
pub use self::result::{Failure, FailureKind, NetworkStatus, QueryResult, QueryState};
pub use self::transport::{HttpTransport, Transport, TransportError, TransportResponse};


/// Whether a query is answered from the cache, the network, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchPolicy {
    /// Use a cached result when present, otherwise fetch.
    #[default]
    CacheFirst,
    /// Show a cached result while fetching a fresh one.
    CacheAndNetwork,
    /// Always fetch.
    NetworkOnly,
}

/// Fetch policies applied when a call does not name one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultOptions {
    pub query: FetchPolicy,
    pub watch_query: FetchPolicy,
}

impl Default for DefaultOptions {
    fn default() -> Self {
        Self {
            query: FetchPolicy::CacheFirst,
            watch_query: FetchPolicy::CacheAndNetwork,
        }
    }
}

struct Shared<T> {
    transport: T,
    cache: Mutex<InMemoryCache>,
    defaults: DefaultOptions,
}

/// Handle to a client and its cache.
///
/// Clones share the same cache, so pages accumulated through one handle are
/// visible through every other.
pub struct QueryClient<T = HttpTransport> {
    inner: Arc<Shared<T>>,
}

impl<T> Clone for QueryClient<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl QueryClient<HttpTransport> {
    /// Create a client talking to the proxy at `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`HolonetError::HttpClient`] if the HTTP client cannot be
    /// constructed.
    pub fn connect(endpoint: Url, policies: TypePolicies) -> Result<Self, HolonetError> {
        Ok(Self::new(HttpTransport::new(endpoint)?, policies))
    }
}

impl<T: Transport> QueryClient<T> {
    pub fn new(transport: T, policies: TypePolicies) -> Self {
        Self::with_defaults(transport, policies, DefaultOptions::default())
    }

    pub fn with_defaults(transport: T, policies: TypePolicies, defaults: DefaultOptions) -> Self {
        Self {
            inner: Arc::new(Shared {
                transport,
                cache: Mutex::new(InMemoryCache::new(policies)),
                defaults,
            }),
        }
    }

    /// Execute `operation` with the default query fetch policy.
    pub async fn query(&self, operation: &Operation) -> QueryResult {
        self.query_with_policy(operation, self.inner.defaults.query)
            .await
    }

    /// Execute `operation` with an explicit fetch policy.
    ///
    /// A one-shot call has nobody to show interim data to, so
    /// [`FetchPolicy::CacheAndNetwork`] behaves like
    /// [`FetchPolicy::NetworkOnly`] here; [`ObservableQuery`] honours it.
    pub async fn query_with_policy(
        &self,
        operation: &Operation,
        policy: FetchPolicy,
    ) -> QueryResult {
        if policy == FetchPolicy::CacheFirst {
            if let Some(data) = self.read_query(operation) {
                debug!("cache hit for {}", operation.label());
                return QueryResult::Success(data);
            }
        }
        self.execute(operation, WriteMode::Replace, operation).await
    }

    /// Observe `operation` using the default watch fetch policy.
    #[must_use]
    pub fn watch_query(&self, operation: Operation) -> ObservableQuery<T> {
        ObservableQuery::new(self.clone(), operation, self.inner.defaults.watch_query)
    }

    /// Observe `operation` with an explicit fetch policy.
    #[must_use]
    pub fn watch_query_with_policy(
        &self,
        operation: Operation,
        policy: FetchPolicy,
    ) -> ObservableQuery<T> {
        ObservableQuery::new(self.clone(), operation, policy)
    }

    /// The cached result of `operation`, without touching the network.
    #[must_use]
    pub fn read_query(&self, operation: &Operation) -> Option<Value> {
        self.with_cache(|cache| cache.read(operation))
    }

    /// A copy of the cached entry stored under `storage_key`.
    #[must_use]
    pub fn read_field(&self, storage_key: &str) -> Option<Value> {
        self.with_cache(|cache| cache.field(storage_key).cloned())
    }

    /// Forget every cached result.
    pub fn reset_store(&self) {
        self.with_cache(InMemoryCache::reset);
    }

    /// Send `sent`, write its data in `mode`, and return the cached result of
    /// `read_back`.
    ///
    /// The cache is only written on success. When `read_back` has no cached
    /// result the fetched data is returned as is.
    pub(crate) async fn execute(
        &self,
        sent: &Operation,
        mode: WriteMode,
        read_back: &Operation,
    ) -> QueryResult {
        let response = match self.inner.transport.send(sent).await {
            Ok(response) => response,
            Err(e) => {
                warn!("{} failed: {e}", sent.label());
                return QueryResult::Failure(Failure::new(FailureKind::Network, e.to_string()));
            }
        };
        let data = match transport::interpret(&response) {
            Ok(data) => data,
            Err(failure) => {
                warn!("{} failed: {failure}", sent.label());
                return QueryResult::Failure(failure);
            }
        };
        let fetched = Value::Object(data.clone());
        let cached = self.with_cache(|cache| {
            cache.write(sent, data, mode);
            cache.read(read_back)
        });
        QueryResult::Success(cached.unwrap_or(fetched))
    }

    fn with_cache<R>(&self, op: impl FnOnce(&mut InMemoryCache) -> R) -> R {
        let mut cache = self
            .inner
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        op(&mut cache)
    }
}
