//! Errors surfaced by library entry points and the command-line interface.

use thiserror::Error;

/// Errors returned by configuration, start-up and client helpers.
///
/// Request-level failures inside the proxy never reach this type; they are
/// turned into HTTP responses at the handler edge.
#[derive(Error, Debug)]
pub enum HolonetError {
    #[error("configuration error: {0}")]
    Config(Box<ortho_config::OrthoError>),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid listen address '{addr}': {source}")]
    InvalidAddress {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },
    #[error("invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("invalid route '{0}': expected a path starting with '/'")]
    InvalidRoute(String),
    #[error("missing required argument '{0}'")]
    MissingArgument(&'static str),
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("bad response: {0}")]
    BadResponse(String),
}

impl From<ortho_config::OrthoError> for HolonetError {
    fn from(err: ortho_config::OrthoError) -> Self {
        Self::Config(Box::new(err))
    }
}
