use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use focus_engine::Services;

use crate::auth::ActorResolver;
use crate::mcp::{self, McpGateway};
use crate::rest;

/// Server configuration.
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8674 }
    }
}

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub resolver: Arc<ActorResolver>,
    pub gateway: Arc<McpGateway>,
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(rest::health))
        .route("/api/actions", get(rest::list_actions))
        .route("/api/actions/unread-count", get(rest::unread_count))
        .route("/api/actions/read", post(rest::mark_read))
        .route("/api/actions/read-all", post(rest::mark_all_read))
        .route(
            "/mcp",
            post(mcp::mcp_post).get(mcp::mcp_get).delete(mcp::mcp_delete),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Create and start the server. Returns a handle to shut it down.
pub async fn start(config: ServerConfig, state: AppState) -> Result<ServerHandle, std::io::Error> {
    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(port = local_addr.port(), "focus server started");

    let task = tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    Ok(ServerHandle {
        port: local_addr.port(),
        task,
    })
}

pub struct ServerHandle {
    pub port: u16,
    task: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    pub fn shutdown(self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use focus_store::actions::ActionRepo;
    use focus_store::users::UserRepo;
    use focus_store::Database;

    use focus_engine::ledger::ActionLogger;

    use crate::auth::StoreSessionProvider;
    use crate::mcp::InMemorySessionStore;

    fn state() -> AppState {
        let db = Database::in_memory().unwrap();
        UserRepo::new(db.clone()).create("a@example.com", "A").unwrap();
        let logger = ActionLogger::spawn(ActionRepo::new(db.clone()));
        let services = Services::new(db.clone(), logger);
        let resolver = Arc::new(ActorResolver::new(
            db.clone(),
            Arc::new(StoreSessionProvider::new(db)),
        ));
        let gateway = Arc::new(McpGateway::new(
            Arc::new(InMemorySessionStore::new()),
            services.clone(),
        ));
        AppState { services, resolver, gateway }
    }

    #[tokio::test]
    async fn router_builds() {
        let _router = build_router(state());
    }

    #[tokio::test]
    async fn server_binds_ephemeral_port() {
        let handle = start(ServerConfig { port: 0 }, state()).await.unwrap();
        assert_ne!(handle.port, 0);
        handle.shutdown();
    }
}
