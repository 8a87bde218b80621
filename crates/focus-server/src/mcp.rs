//! MCP protocol endpoint: a session router bridging streamable-HTTP
//! requests onto per-session tool servers.
//!
//! Session lifecycle per id: a POST without a session id, or with one the
//! registry does not recognize, gets a freshly created session whose id is
//! returned in the `mcp-session-id` response header; the registry entry is
//! inserted only after that first request has been handled. A POST with a
//! known id routes to the existing instance. DELETE (or transport teardown)
//! removes the entry; in-flight requests are unaffected, only future lookups
//! miss. GET is rejected — the protocol here is request-oriented per call.
//!
//! The in-memory registry is process-wide and not shareable across
//! instances; horizontal scaling needs an external SessionStore
//! implementation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use dashmap::DashMap;
use serde_json::json;
use tracing::{info, instrument};

use focus_core::actor::AuthenticatedPrincipal;
use focus_core::ids::McpSessionId;
use focus_core::tools::ToolContext;
use focus_engine::registry::ToolRegistry;
use focus_engine::{tools, Services};

use crate::rpc::{self, RpcRequest, RpcResponse};
use crate::server::AppState;

pub const SESSION_HEADER: &str = "mcp-session-id";
const PROTOCOL_VERSION: &str = "2025-03-26";

/// One session's tool server: the registry plus protocol state.
pub struct ToolServer {
    registry: ToolRegistry,
    initialized: AtomicBool,
}

impl ToolServer {
    pub fn new(services: &Services) -> Self {
        Self {
            registry: tools::build_registry(services),
            initialized: AtomicBool::new(false),
        }
    }

    pub fn initialized(&self) -> bool {
        self.initialized.load(Ordering::Relaxed)
    }

    pub async fn handle_request(
        &self,
        req: RpcRequest,
        principal: &AuthenticatedPrincipal,
    ) -> RpcResponse {
        match req.method.as_str() {
            "initialize" => {
                self.initialized.store(true, Ordering::Relaxed);
                RpcResponse::success(
                    req.id,
                    json!({
                        "protocolVersion": PROTOCOL_VERSION,
                        "capabilities": {
                            "tools": { "listChanged": false }
                        },
                        "serverInfo": {
                            "name": "focus-mcp",
                            "version": env!("CARGO_PKG_VERSION")
                        }
                    }),
                )
            }

            "notifications/initialized" | "ping" => RpcResponse::success(req.id, json!({})),

            "tools/list" => RpcResponse::success(
                req.id,
                json!({ "tools": self.registry.definitions() }),
            ),

            "tools/call" => {
                let params = req.params.unwrap_or_else(|| json!({}));
                let name = match rpc::require_str(&params, "name") {
                    Ok(name) => name.to_string(),
                    Err(e) => return RpcResponse::invalid_params(req.id, e),
                };
                let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

                let ctx = ToolContext {
                    principal: principal.clone(),
                };
                let result = tools::dispatch(&self.registry, &name, arguments, &ctx).await;
                RpcResponse::success(req.id, result)
            }

            other => RpcResponse::method_not_found(req.id, other),
        }
    }
}

pub struct McpSession {
    pub id: McpSessionId,
    pub server: ToolServer,
}

impl McpSession {
    fn new(services: &Services) -> Self {
        Self {
            id: McpSessionId::new(),
            server: ToolServer::new(services),
        }
    }
}

/// Registry seam. The in-memory implementation serves single-instance
/// deployments; a shared-cache implementation would slot in here for
/// multi-instance ones.
pub trait SessionStore: Send + Sync {
    fn get(&self, id: &str) -> Option<Arc<McpSession>>;
    fn put(&self, session: Arc<McpSession>);
    fn remove(&self, id: &str) -> bool;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<String, Arc<McpSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, id: &str) -> Option<Arc<McpSession>> {
        self.sessions.get(id).map(|entry| Arc::clone(entry.value()))
    }

    fn put(&self, session: Arc<McpSession>) {
        self.sessions.insert(session.id.to_string(), session);
    }

    fn remove(&self, id: &str) -> bool {
        self.sessions.remove(id).is_some()
    }

    fn len(&self) -> usize {
        self.sessions.len()
    }
}

pub struct McpGateway {
    store: Arc<dyn SessionStore>,
    services: Services,
}

impl McpGateway {
    pub fn new(store: Arc<dyn SessionStore>, services: Services) -> Self {
        Self { store, services }
    }

    /// Route one request. A missing or unrecognized session id gets a fresh
    /// session; its registry entry lands only after the request has been
    /// handled.
    #[instrument(skip(self, principal, body), fields(session_id = session_id.unwrap_or("-")))]
    pub async fn handle_post(
        &self,
        session_id: Option<&str>,
        principal: AuthenticatedPrincipal,
        body: serde_json::Value,
    ) -> (Option<McpSessionId>, RpcResponse) {
        let id_hint = body.get("id").cloned();
        let req: RpcRequest = match serde_json::from_value(body) {
            Ok(req) => req,
            Err(e) => {
                return (
                    None,
                    RpcResponse::error(id_hint, rpc::INVALID_REQUEST, format!("invalid request: {e}")),
                );
            }
        };

        let existing = session_id.and_then(|id| self.store.get(id));
        let (session, known) = match existing {
            Some(session) => (session, true),
            None => (Arc::new(McpSession::new(&self.services)), false),
        };

        let response = session.server.handle_request(req, &principal).await;

        if !known {
            self.store.put(Arc::clone(&session));
            info!(session_id = %session.id, active = self.store.len(), "mcp session created");
        }

        (Some(session.id.clone()), response)
    }

    /// Explicit close or transport teardown. Only future lookups are
    /// affected.
    pub fn close(&self, session_id: &str) -> bool {
        let removed = self.store.remove(session_id);
        if removed {
            info!(session_id, active = self.store.len(), "mcp session closed");
        }
        removed
    }

    pub fn session_count(&self) -> usize {
        self.store.len()
    }
}

// ── Axum handlers ──

pub async fn mcp_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Response {
    let Some(principal) = state.resolver.resolve(&headers).await else {
        let id = body.get("id").cloned();
        return Json(RpcResponse::unauthorized(id)).into_response();
    };

    let session_header = headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok());
    let (session_id, response) = state
        .gateway
        .handle_post(session_header, principal, body)
        .await;

    match session_id {
        Some(id) => ([(SESSION_HEADER, id.to_string())], Json(response)).into_response(),
        None => Json(response).into_response(),
    }
}

pub async fn mcp_get() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({
            "error": "GET is not supported on this endpoint; POST JSON-RPC requests instead"
        })),
    )
        .into_response()
}

pub async fn mcp_delete(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(session_id) = headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "missing mcp-session-id header"})),
        )
            .into_response();
    };

    if state.gateway.close(session_id) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "session not found - it may have expired"})),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use focus_store::actions::ActionRepo;
    use focus_store::users::UserRepo;
    use focus_store::Database;

    use focus_engine::ledger::ActionLogger;

    fn gateway() -> (McpGateway, AuthenticatedPrincipal, Arc<InMemorySessionStore>) {
        let db = Database::in_memory().unwrap();
        let user = UserRepo::new(db.clone()).create("a@example.com", "A").unwrap();
        let logger = ActionLogger::spawn(ActionRepo::new(db.clone()));
        let services = Services::new(db, logger);
        let store = Arc::new(InMemorySessionStore::new());
        let gateway = McpGateway::new(store.clone(), services);
        let principal = AuthenticatedPrincipal::for_agent(user, "assistant");
        (gateway, principal, store)
    }

    fn initialize_body() -> serde_json::Value {
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {"protocolVersion": "2025-03-26"}
        })
    }

    #[tokio::test]
    async fn first_request_creates_session() {
        let (gateway, principal, store) = gateway();

        let (session_id, response) = gateway.handle_post(None, principal, initialize_body()).await;
        let session_id = session_id.unwrap();

        assert!(!response.is_error());
        assert_eq!(store.len(), 1);
        assert!(store.get(session_id.as_str()).unwrap().server.initialized());
    }

    #[tokio::test]
    async fn known_session_id_routes_to_same_instance() {
        let (gateway, principal, store) = gateway();

        let (session_id, _) = gateway
            .handle_post(None, principal.clone(), initialize_body())
            .await;
        let session_id = session_id.unwrap();
        let first = store.get(session_id.as_str()).unwrap();

        // State set by request 1 is observed by request 2
        let (second_id, response) = gateway
            .handle_post(
                Some(session_id.as_str()),
                principal,
                json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
            )
            .await;

        assert_eq!(second_id.unwrap(), session_id);
        assert!(!response.is_error());
        assert_eq!(store.len(), 1);
        assert!(Arc::ptr_eq(&first, &store.get(session_id.as_str()).unwrap()));
        assert!(first.server.initialized());
    }

    #[tokio::test]
    async fn unknown_session_id_gets_fresh_session() {
        let (gateway, principal, store) = gateway();

        let (session_id, response) = gateway
            .handle_post(Some("mcp_stale"), principal, initialize_body())
            .await;
        let session_id = session_id.unwrap();

        assert!(!response.is_error());
        assert_ne!(session_id.as_str(), "mcp_stale");
        assert!(store.get("mcp_stale").is_none());
        assert!(store.get(session_id.as_str()).is_some());
    }

    #[tokio::test]
    async fn fresh_session_is_not_initialized_by_tool_call() {
        let (gateway, principal, store) = gateway();

        let (session_id, _) = gateway
            .handle_post(
                None,
                principal,
                json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}),
            )
            .await;
        assert!(!store.get(session_id.unwrap().as_str()).unwrap().server.initialized());
    }

    #[tokio::test]
    async fn close_removes_session() {
        let (gateway, principal, store) = gateway();

        let (session_id, _) = gateway.handle_post(None, principal, initialize_body()).await;
        let session_id = session_id.unwrap();

        assert!(gateway.close(session_id.as_str()));
        assert!(store.get(session_id.as_str()).is_none());
        assert!(!gateway.close(session_id.as_str()));
        assert_eq!(gateway.session_count(), 0);
    }

    #[tokio::test]
    async fn tool_call_round_trip() {
        let (gateway, principal, _store) = gateway();

        let (session_id, _) = gateway
            .handle_post(None, principal.clone(), initialize_body())
            .await;

        let (_, response) = gateway
            .handle_post(
                session_id.as_ref().map(|id| id.as_str()),
                principal,
                json!({
                    "jsonrpc": "2.0",
                    "id": 3,
                    "method": "tools/call",
                    "params": {
                        "name": "focus_create_task",
                        "arguments": {"title": "From the agent", "priority": "p2"}
                    }
                }),
            )
            .await;

        let result = response.result.unwrap();
        let text = result["content"][0]["text"].as_str().unwrap();
        let envelope: serde_json::Value = serde_json::from_str(text).unwrap();
        assert_eq!(envelope["success"], true);
        assert_eq!(envelope["data"]["title"], "From the agent");
    }

    #[tokio::test]
    async fn tool_call_without_name_is_invalid_params() {
        let (gateway, principal, _store) = gateway();

        let (_, response) = gateway
            .handle_post(
                None,
                principal,
                json!({"jsonrpc": "2.0", "id": 4, "method": "tools/call", "params": {}}),
            )
            .await;
        assert!(response.is_error());
    }

    #[tokio::test]
    async fn unknown_method_is_method_not_found() {
        let (gateway, principal, _store) = gateway();

        let (_, response) = gateway
            .handle_post(
                None,
                principal,
                json!({"jsonrpc": "2.0", "id": 5, "method": "resources/list"}),
            )
            .await;
        let error = response.error.unwrap();
        assert_eq!(error.code, rpc::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_request_creates_no_session() {
        let (gateway, principal, store) = gateway();

        let (session_id, response) = gateway
            .handle_post(None, principal, json!({"id": 9, "params": {}}))
            .await;
        assert!(session_id.is_none());
        assert!(response.is_error());
        assert_eq!(store.len(), 0);
    }
}
