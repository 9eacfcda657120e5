//! `holonet` command-line entry point.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use holonet::client::ClientCell;
use holonet::config::{
    PeopleSettings, PersonSettings, ServeSettings, load_subcommand, load_with_required_fallback,
};
use holonet::proxy::{ForwardingProxy, HttpUpstream, ProxyServer};
use holonet::swapi::{self, ALL_PEOPLE_FIELD};
use holonet::{PeopleArgs, PersonArgs, QueryClient, ServeArgs};
use log::{error, info, warn};
use serde_json::Value;
use tokio::net::TcpListener;

/// Cursor variable of the `AllPeople` operation.
const CURSOR_VARIABLE: &str = "after";

#[derive(Parser)]
#[command(
    name = "holonet",
    version,
    about = "GraphQL forwarding proxy and paginated SWAPI browser"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the forwarding proxy
    Serve(ServeArgs),
    /// List people through the proxy, following pages
    People(PeopleArgs),
    /// Show one person through the proxy
    Person(PersonArgs),
}

async fn serve(args: &ServeArgs) -> Result<()> {
    let settings = ServeSettings::try_from(load_subcommand(args)?)?;
    let upstream = HttpUpstream::new(settings.upstream.clone())?;
    let listener = TcpListener::bind(settings.listen)
        .await
        .with_context(|| format!("binding {}", settings.listen))?;
    info!("forwarding to {}", settings.upstream.as_str());
    let server = ProxyServer::new(ForwardingProxy::new(upstream), settings.route);
    server
        .serve(listener, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("cannot listen for ctrl-c: {e}");
                std::future::pending::<()>().await;
            }
        })
        .await?;
    Ok(())
}

async fn people(args: &PeopleArgs, clients: &ClientCell) -> Result<()> {
    let settings = PeopleSettings::try_from(load_subcommand(args)?)?;
    let client = clients
        .get_or_try_init(|| QueryClient::connect(settings.proxy.clone(), swapi::type_policies()))?;
    let list = client.watch_query(swapi::all_people(settings.page_size));
    let mut state = list.load().await;
    for _ in 1..settings.pages {
        if state.error.is_some() {
            break;
        }
        match list.fetch_next(ALL_PEOPLE_FIELD, CURSOR_VARIABLE).await? {
            Some(next) => state = next,
            None => break,
        }
    }
    if let Some(failure) = state.error {
        return Err(failure).context("loading people");
    }
    let people = state
        .data
        .as_ref()
        .and_then(|data| data.get(ALL_PEOPLE_FIELD))
        .unwrap_or(&Value::Null);
    println!("{}", serde_json::to_string_pretty(people)?);
    Ok(())
}

async fn person(args: PersonArgs, clients: &ClientCell) -> Result<()> {
    let settings = PersonSettings::try_from(load_with_required_fallback(args, "id")?)?;
    let client = clients
        .get_or_try_init(|| QueryClient::connect(settings.proxy.clone(), swapi::type_policies()))?;
    let data = client
        .query(&swapi::person(&settings.id))
        .await
        .into_result()
        .with_context(|| format!("loading person {}", settings.id))?;
    if data.get("person").is_none_or(Value::is_null) {
        warn!("no person with id {}", settings.id);
    }
    println!("{}", serde_json::to_string_pretty(&data)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let clients: ClientCell = ClientCell::new();
    match cli.command {
        Commands::Serve(args) => serve(&args).await,
        Commands::People(args) => people(&args, &clients).await,
        Commands::Person(args) => person(args, &clients).await,
    }
}
