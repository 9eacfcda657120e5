//! Outcomes and observable state of client operations.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Why an operation produced no data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The request never produced a response.
    Network,
    /// The server answered with a non-2xx status.
    Http { status: u16 },
    /// The response body was not a GraphQL response document.
    Decode,
    /// The response carried GraphQL errors.
    GraphQl,
    /// The response carried neither data nor errors.
    EmptyResponse,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => f.write_str("network error"),
            Self::Http { status } => write!(f, "HTTP status {status}"),
            Self::Decode => f.write_str("malformed response"),
            Self::GraphQl => f.write_str("GraphQL errors"),
            Self::EmptyResponse => f.write_str("empty response"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {detail}")]
pub struct Failure {
    pub kind: FailureKind,
    pub detail: String,
}

impl Failure {
    pub fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

/// Result of executing one operation.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    Success(Value),
    Failure(Failure),
}

impl QueryResult {
    #[must_use]
    pub fn data(&self) -> Option<&Value> {
        match self {
            Self::Success(data) => Some(data),
            Self::Failure(_) => None,
        }
    }

    #[must_use]
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Self::Success(_) => None,
            Self::Failure(failure) => Some(failure),
        }
    }

    /// Convert into a `Result` for `?`-style callers.
    ///
    /// # Errors
    ///
    /// Returns the contained [`Failure`].
    pub fn into_result(self) -> Result<Value, Failure> {
        match self {
            Self::Success(data) => Ok(data),
            Self::Failure(failure) => Err(failure),
        }
    }

    /// Deserialize the data into `T`, reporting the path that failed.
    ///
    /// # Errors
    ///
    /// Returns the contained [`Failure`], or a [`FailureKind::Decode`]
    /// failure naming the offending path.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, Failure> {
        let data = match self {
            Self::Success(data) => data,
            Self::Failure(failure) => return Err(failure.clone()),
        };
        serde_path_to_error::deserialize(data).map_err(|e| {
            let path = e.path().to_string();
            let inner = e.into_inner();
            Failure::new(FailureKind::Decode, format!("{inner} at {path}"))
        })
    }
}

/// Network activity of an observed query.
///
/// Discriminants follow the numeric codes front-end code conventionally
/// compares against.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStatus {
    Loading = 1,
    FetchMore = 3,
    Refetch = 4,
    Ready = 7,
    Error = 8,
}

impl NetworkStatus {
    #[must_use]
    pub fn is_in_flight(self) -> bool {
        matches!(self, Self::Loading | Self::FetchMore | Self::Refetch)
    }
}

/// What a view layer observes: `{ data, loading, error }`.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState {
    pub data: Option<Value>,
    pub loading: bool,
    pub error: Option<Failure>,
    pub network_status: NetworkStatus,
}

impl QueryState {
    pub(crate) fn in_flight(data: Option<Value>, network_status: NetworkStatus) -> Self {
        Self {
            data,
            loading: true,
            error: None,
            network_status,
        }
    }

    pub(crate) fn ready(data: Value) -> Self {
        Self {
            data: Some(data),
            loading: false,
            error: None,
            network_status: NetworkStatus::Ready,
        }
    }

    pub(crate) fn failed(data: Option<Value>, failure: Failure) -> Self {
        Self {
            data,
            loading: false,
            error: Some(failure),
            network_status: NetworkStatus::Error,
        }
    }
}
