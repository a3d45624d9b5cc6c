//! PezAuth: dispenses one cloud organization per user.

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pezauth_db::DbManager;
use pezauth_keygen::{KeyGen, UuidGuidMaker};
use pezauth_org::identity::{HttpUserInfo, resolve_identity};
use pezauth_org::{CloudControllerClient, OAuthTokens, OrgManager};
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;

#[derive(Debug, Parser)]
#[command(name = "pezauth")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Act for this user instead of the token's owner.
    #[arg(long, env = "PEZ_USERNAME")]
    username: Option<String>,

    /// OAuth access token of the calling user.
    #[arg(long, env = "PEZ_ACCESS_TOKEN", hide_env_values = true)]
    access_token: String,

    /// OAuth refresh token of the calling user.
    #[arg(long, env = "PEZ_REFRESH_TOKEN", hide_env_values = true, default_value = "")]
    refresh_token: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
enum Commands {
    /// Print the user's org record.
    Show,
    /// Return the user's org, allocating one if needed.
    Allocate,
    /// Provision a new org, replacing any existing record.
    Create,
    /// Delete the user's org record and reservations.
    Release,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pezauth=info")),
        )
        .json()
        .init();

    let cli = Cli::parse();
    let config = ServerConfig::from_env()?;
    run(cli, config).await
}

async fn run(cli: Cli, config: ServerConfig) -> Result<()> {
    let tokens = OAuthTokens::new(cli.access_token, cli.refresh_token, None);

    let username = match cli.username {
        Some(username) => username,
        None => {
            let source = HttpUserInfo::new(&config.userinfo_url, reqwest::Client::new())?;
            resolve_identity(&source, &tokens, &config.org.allowed_domain)
                .await
                .with_context(|| "resolve calling user")?
        }
    };

    let db = DbManager::connect(&config.db)
        .await
        .with_context(|| format!("connect to SurrealDB at {}", config.db.url))?;
    pezauth_db::run_migrations(db.client())
        .await
        .with_context(|| "run migrations")?;
    let store = db.collection();

    // Reservation keys live in SurrealDB, in their own database when
    // PEZ_KV_URI is set.
    let kv = match &config.kv {
        Some(kv_config) => {
            let kv = DbManager::connect(kv_config)
                .await
                .with_context(|| format!("connect to reservation store at {}", kv_config.url))?;
            pezauth_db::run_migrations(kv.client())
                .await
                .with_context(|| "run reservation store migrations")?;
            kv
        }
        None => db.clone(),
    };
    let keygen = KeyGen::new(kv.kv_store(), UuidGuidMaker::default())
        .with_ttl(config.org.reservation_ttl());
    let client = CloudControllerClient::new(&config.org.api_url, config.org.request_timeout())?;

    let manager = OrgManager::new(username, &tokens, &store, &keygen, &client, &config.org);
    tracing::info!(username = manager.username(), command = ?cli.command, "Running command");

    let org = match cli.command {
        Commands::Show => manager.show().await?,
        Commands::Allocate => manager.safe_create().await?,
        Commands::Create => manager.create().await?,
        Commands::Release => {
            manager.remove().await?;
            println!("released org of {}", manager.username());
            return Ok(());
        }
    };

    println!("{}", serde_json::to_string_pretty(&org)?);
    Ok(())
}
