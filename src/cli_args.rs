//! Command-line argument structures.
//!
//! Every field is optional so `ortho_config` can fill gaps from
//! `.holonet.toml` and `HOLONETCMDS_<NAME>_<FIELD>` variables; unset values
//! fall back to defaults in [`crate::config`].

use clap::Parser;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

/// Parameters accepted by the `serve` sub-command.
#[derive(Parser, Deserialize, Serialize, Default, Debug, OrthoConfig, Clone)]
#[command(name = "serve")]
#[ortho_config(prefix = "HOLONET")]
pub struct ServeArgs {
    /// Socket address to listen on [default: 127.0.0.1:3000]
    #[arg(long, value_name = "ADDR")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listen: Option<String>,
    /// GraphQL endpoint requests are forwarded to
    #[arg(long, value_name = "URL")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream: Option<String>,
    /// Path the proxy answers on [default: /proxy]
    #[arg(long, value_name = "PATH")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
}

/// Parameters accepted by the `people` sub-command.
#[derive(Parser, Deserialize, Serialize, Default, Debug, OrthoConfig, Clone)]
#[command(name = "people")]
#[ortho_config(prefix = "HOLONET")]
pub struct PeopleArgs {
    /// Proxy URL [default: http://127.0.0.1:3000/proxy]
    #[arg(long, value_name = "URL")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    /// People requested per page [default: 20]
    #[arg(long, value_name = "N")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    /// Maximum number of pages to walk [default: 1]
    #[arg(long, value_name = "N")]
    #[ortho_config(cli_short = 'n')]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<u32>,
}

/// Parameters accepted by the `person` sub-command.
#[derive(Parser, Deserialize, Serialize, Debug, OrthoConfig, Clone)]
#[command(name = "person")]
#[ortho_config(prefix = "HOLONET")]
pub struct PersonArgs {
    /// Global ID of the person, e.g. `cGVvcGxlOjE=`
    #[arg(required = true)]
    // Clap always yields `Some`; `Option` lets defaults and config merging
    // leave it unset.
    pub id: Option<String>,
    /// Proxy URL [default: http://127.0.0.1:3000/proxy]
    #[arg(long, value_name = "URL")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
}

#[expect(
    clippy::derivable_impls,
    reason = "manual impl clarifies absent id state"
)]
impl Default for PersonArgs {
    fn default() -> Self {
        Self {
            id: None,
            proxy: None,
        }
    }
}
