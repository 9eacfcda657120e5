//! Configuration loading and validated settings.
//!
//! Arguments are merged by `ortho_config` (defaults < file < environment <
//! CLI) and then resolved into settings with every default applied and every
//! value checked.

use figment::error::{Error as FigmentError, Kind as FigmentKind};
use ortho_config::{OrthoConfig, OrthoError, load_and_merge_subcommand_for};
use std::net::SocketAddr;
use url::Url;

use crate::HolonetError;
use crate::cli_args::{PeopleArgs, PersonArgs, ServeArgs};
use crate::proxy::Endpoint;
use crate::swapi::{PAGE_SIZE, SWAPI_GRAPHQL_URL};

pub const DEFAULT_LISTEN: &str = "127.0.0.1:3000";
pub const DEFAULT_ROUTE: &str = "/proxy";
pub const DEFAULT_PROXY_URL: &str = "http://127.0.0.1:3000/proxy";
pub const DEFAULT_PAGES: u32 = 1;

fn missing_field(err: &FigmentError, field: &str) -> bool {
    // FigmentError yields its causes only by value; clone to inspect without ownership.
    err.clone()
        .into_iter()
        .any(|e| matches!(e.kind, FigmentKind::MissingField(ref f) if f == field))
}

/// Merge configuration sources into `cli_args`.
///
/// # Errors
///
/// Returns [`HolonetError::Config`] when a source cannot be read or parsed.
pub fn load_subcommand<T>(cli_args: &T) -> Result<T, HolonetError>
where
    T: OrthoConfig + serde::Serialize + Default + clap::CommandFactory + Clone,
{
    Ok(load_and_merge_subcommand_for::<T>(cli_args)?)
}

/// Like [`load_subcommand`], but falls back to `cli_args` when the only
/// problem is that no source supplied `field`.
///
/// # Errors
///
/// Returns [`HolonetError::Config`] for any other gathering failure.
pub fn load_with_required_fallback<T>(cli_args: T, field: &str) -> Result<T, HolonetError>
where
    T: OrthoConfig + serde::Serialize + Default + clap::CommandFactory + Clone,
{
    match load_and_merge_subcommand_for::<T>(&cli_args) {
        Ok(v) => Ok(v),
        Err(OrthoError::Gathering(e)) if missing_field(&e, field) => Ok(cli_args),
        Err(e) => Err(e.into()),
    }
}

fn parse_url(url: &str) -> Result<Url, HolonetError> {
    Url::parse(url).map_err(|source| HolonetError::InvalidUrl {
        url: url.to_string(),
        source,
    })
}

fn proxy_url(proxy: Option<&str>) -> Result<Url, HolonetError> {
    parse_url(proxy.unwrap_or(DEFAULT_PROXY_URL))
}

/// Everything `holonet serve` needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeSettings {
    pub listen: SocketAddr,
    pub upstream: Endpoint,
    pub route: String,
}

impl TryFrom<ServeArgs> for ServeSettings {
    type Error = HolonetError;

    fn try_from(args: ServeArgs) -> Result<Self, Self::Error> {
        let addr = args.listen.unwrap_or_else(|| DEFAULT_LISTEN.to_string());
        let listen = addr
            .parse()
            .map_err(|source| HolonetError::InvalidAddress {
                addr: addr.clone(),
                source,
            })?;
        let upstream = match args.upstream {
            Some(url) => {
                parse_url(&url)?;
                Endpoint::new(url)
            }
            None => Endpoint::new(SWAPI_GRAPHQL_URL),
        };
        let route = args.route.unwrap_or_else(|| DEFAULT_ROUTE.to_string());
        if !route.starts_with('/') {
            return Err(HolonetError::InvalidRoute(route));
        }
        Ok(Self {
            listen,
            upstream,
            route,
        })
    }
}

/// Everything `holonet people` needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeopleSettings {
    pub proxy: Url,
    pub page_size: u32,
    /// Always at least one.
    pub pages: u32,
}

impl TryFrom<PeopleArgs> for PeopleSettings {
    type Error = HolonetError;

    fn try_from(args: PeopleArgs) -> Result<Self, Self::Error> {
        Ok(Self {
            proxy: proxy_url(args.proxy.as_deref())?,
            page_size: args.page_size.unwrap_or(PAGE_SIZE),
            pages: args.pages.unwrap_or(DEFAULT_PAGES).max(1),
        })
    }
}

/// Everything `holonet person` needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonSettings {
    pub proxy: Url,
    pub id: String,
}

impl TryFrom<PersonArgs> for PersonSettings {
    type Error = HolonetError;

    fn try_from(args: PersonArgs) -> Result<Self, Self::Error> {
        let id = args
            .id
            .filter(|id| !id.is_empty())
            .ok_or(HolonetError::MissingArgument("id"))?;
        Ok(Self {
            proxy: proxy_url(args.proxy.as_deref())?,
            id,
        })
    }
}
