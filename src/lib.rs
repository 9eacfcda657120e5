//! Holonet: a same-origin GraphQL forwarding proxy and a caching query client
//! that accumulates paginated connections.
//!
//! The [`proxy`] module relays `POST` and `GET` requests to a fixed upstream
//! GraphQL service. The [`client`] module talks to that proxy, caches results
//! and merges pages of a connection into one list. [`swapi`] holds the
//! operations and cache policies for the Star Wars API the proxy fronts by
//! default.

pub mod cli_args;
pub mod client;
pub mod config;
pub mod envelope;
mod error;
pub mod proxy;
mod snippet;
pub mod swapi;
pub mod test_utils;

pub use cli_args::{PeopleArgs, PersonArgs, ServeArgs};
pub use client::{ClientCell, Operation, QueryClient, QueryResult};
pub use error::HolonetError;
pub use proxy::{ForwardingProxy, HttpUpstream, ProxyServer};

/// `user-agent` sent on every outbound request.
pub(crate) const USER_AGENT: &str = concat!("holonet/", env!("CARGO_PKG_VERSION"));
