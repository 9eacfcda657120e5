//! A watched query whose state a view layer can follow.

use log::{debug, warn};
use serde_json::{Map, Value};
use tokio::sync::watch;

use super::cache::WriteMode;
use super::connection::PageInfo;
use super::operation::Operation;
use super::result::{NetworkStatus, QueryResult, QueryState};
use super::{FetchPolicy, HttpTransport, QueryClient, Transport};
use crate::HolonetError;

/// One operation bound to a client, publishing [`QueryState`] updates.
///
/// Calls that change the state (`load`, `refetch`, `fetch_more`) must not
/// overlap: pages are appended in completion order.
pub struct ObservableQuery<T = HttpTransport> {
    client: QueryClient<T>,
    operation: Operation,
    policy: FetchPolicy,
    state: watch::Sender<QueryState>,
}

impl<T: Transport> ObservableQuery<T> {
    pub(crate) fn new(client: QueryClient<T>, operation: Operation, policy: FetchPolicy) -> Self {
        let (state, _) = watch::channel(QueryState::in_flight(None, NetworkStatus::Loading));
        Self {
            client,
            operation,
            policy,
            state,
        }
    }

    #[must_use]
    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    /// Receive every state this query publishes from now on.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<QueryState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn current(&self) -> QueryState {
        self.state.borrow().clone()
    }

    /// Produce a result according to the fetch policy.
    pub async fn load(&self) -> QueryState {
        let cached = self.client.read_query(&self.operation);
        match (self.policy, cached) {
            (FetchPolicy::CacheFirst, Some(data)) => {
                return self.publish(QueryState::ready(data));
            }
            (FetchPolicy::CacheAndNetwork, Some(data)) => {
                self.publish(QueryState::in_flight(Some(data), NetworkStatus::Loading));
            }
            _ => {
                let previous = self.state.borrow().data.clone();
                self.publish(QueryState::in_flight(previous, NetworkStatus::Loading));
            }
        }
        let result = self
            .client
            .execute(&self.operation, WriteMode::Replace, &self.operation)
            .await;
        self.finish(result)
    }

    /// Re-run the operation from the network, replacing its cached result.
    pub async fn refetch(&self) -> QueryState {
        let previous = self.state.borrow().data.clone();
        self.publish(QueryState::in_flight(previous, NetworkStatus::Refetch));
        let result = self
            .client
            .execute(&self.operation, WriteMode::Replace, &self.operation)
            .await;
        self.finish(result)
    }

    /// Fetch with `extra` laid over the operation's variables and merge the
    /// result into the cache.
    ///
    /// On failure the cache is left as it was and the state keeps the data
    /// it had, with the error attached.
    pub async fn fetch_more(&self, extra: Map<String, Value>) -> QueryState {
        if self.state.borrow().network_status == NetworkStatus::FetchMore {
            warn!(
                "overlapping fetch_more on {}; page order is undefined",
                self.operation.label()
            );
        }
        let previous = self.state.borrow().data.clone();
        self.publish(QueryState::in_flight(previous, NetworkStatus::FetchMore));
        let next = self.operation.merged(extra);
        let result = self
            .client
            .execute(&next, WriteMode::Merge, &self.operation)
            .await;
        self.finish(result)
    }

    /// Fetch the page after the one last seen on connection `field`.
    ///
    /// The connection's `pageInfo.endCursor` is sent as variable
    /// `cursor_variable`. Returns `Ok(None)` when the connection reports no
    /// further pages.
    ///
    /// # Errors
    ///
    /// Returns [`HolonetError::BadResponse`] when the current data has no
    /// readable `pageInfo` for `field`, or when more pages are reported
    /// without a cursor.
    pub async fn fetch_next(
        &self,
        field: &str,
        cursor_variable: &str,
    ) -> Result<Option<QueryState>, HolonetError> {
        let page_info = self
            .state
            .borrow()
            .data
            .as_ref()
            .and_then(|data| data.get(field))
            .and_then(|conn| conn.get("pageInfo"))
            .cloned()
            .ok_or_else(|| HolonetError::BadResponse(format!("no pageInfo for {field}")))?;
        let page_info: PageInfo = serde_json::from_value(page_info)
            .map_err(|e| HolonetError::BadResponse(format!("pageInfo for {field}: {e}")))?;
        let Some(cursor) = page_info.next_cursor()? else {
            debug!("{field} has no further pages");
            return Ok(None);
        };
        let mut extra = Map::new();
        extra.insert(cursor_variable.to_string(), Value::String(cursor.to_string()));
        Ok(Some(self.fetch_more(extra).await))
    }

    fn finish(&self, result: QueryResult) -> QueryState {
        let state = match result {
            QueryResult::Success(data) => QueryState::ready(data),
            QueryResult::Failure(failure) => {
                let previous = self.state.borrow().data.clone();
                QueryState::failed(previous, failure)
            }
        };
        self.publish(state)
    }

    fn publish(&self, state: QueryState) -> QueryState {
        self.state.send_replace(state.clone());
        state
    }
}
