use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use focus_engine::ledger::ActionLogger;
use focus_engine::Services;
use focus_server::auth::{ActorResolver, StoreSessionProvider};
use focus_server::mcp::{InMemorySessionStore, McpGateway};
use focus_server::{AppState, ServerConfig};
use focus_store::actions::ActionRepo;
use focus_store::tokens::TokenRepo;
use focus_store::users::UserRepo;
use focus_store::Database;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("starting focus server");

    let focus_dir = dirs_home().join(".focus").join("database");
    std::fs::create_dir_all(&focus_dir).context("create database directory")?;
    let db_path = focus_dir.join("focus.db");

    let db = Database::open(&db_path).context("open database")?;

    // Single-owner deployment: bootstrap the owner account and, on first
    // run, an agent token whose raw value is printed exactly once.
    let users = UserRepo::new(db.clone());
    let owner_email =
        std::env::var("FOCUS_OWNER_EMAIL").unwrap_or_else(|_| "owner@localhost".to_string());
    let owner = users.get_or_create(&owner_email, "Owner").context("bootstrap owner")?;

    let tokens = TokenRepo::new(db.clone());
    if tokens.list(&owner.id)?.is_empty() {
        let (_, raw) = tokens.mint(&owner.id, "default-agent")?;
        tracing::info!(token = %raw, "minted initial agent token (shown only once)");
    }

    let logger = ActionLogger::spawn(ActionRepo::new(db.clone()));
    let services = Services::new(db.clone(), logger.clone());
    let resolver = Arc::new(ActorResolver::new(
        db.clone(),
        Arc::new(StoreSessionProvider::new(db.clone())),
    ));
    let gateway = Arc::new(McpGateway::new(
        Arc::new(InMemorySessionStore::new()),
        services.clone(),
    ));

    let state = AppState { services, resolver, gateway };
    let config = ServerConfig::default();
    let handle = focus_server::start(config, state).await.context("start server")?;

    tracing::info!(port = handle.port, user = %owner.email, "focus server ready");

    tokio::signal::ctrl_c().await.context("listen for ctrl+c")?;

    tracing::info!("shutting down");
    logger.flush().await;
    handle.shutdown();

    Ok(())
}

fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}
