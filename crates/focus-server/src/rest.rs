//! REST surface for the action feed: list, unread count, and mark-read.
//! Every route resolves the acting principal first; ledger read/write-path
//! errors surface as 500s with the underlying message for diagnosis.

use std::str::FromStr;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use focus_core::action::EntityType;
use focus_core::actor::ActorKind;
use focus_core::ids::ActionId;
use focus_engine::actions::ActionListRequest;

use crate::server::AppState;

/// Query filters for the action feed. camelCase aliases keep the original
/// client wire format working alongside snake_case.
#[derive(Debug, Deserialize)]
pub struct ActionsListParams {
    pub limit: Option<u32>,
    #[serde(alias = "isRead")]
    pub is_read: Option<bool>,
    #[serde(alias = "entityType")]
    pub entity_type: Option<String>,
    #[serde(alias = "entityId")]
    pub entity_id: Option<String>,
    #[serde(alias = "actorType")]
    pub actor_kind: Option<String>,
    #[serde(alias = "includeOwn")]
    pub include_own: Option<bool>,
}

pub async fn list_actions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ActionsListParams>,
) -> Response {
    let Some(principal) = state.resolver.resolve(&headers).await else {
        return unauthorized();
    };

    let entity_type = match params.entity_type.as_deref().map(EntityType::from_str).transpose() {
        Ok(value) => value,
        Err(detail) => return bad_request("entity_type", detail),
    };
    let actor_kind = match params.actor_kind.as_deref().map(ActorKind::from_str).transpose() {
        Ok(value) => value,
        Err(detail) => return bad_request("actor_kind", detail),
    };

    let request = ActionListRequest {
        actor_kind,
        entity_type,
        entity_id: params.entity_id,
        is_read: params.is_read,
        include_own: params.include_own.unwrap_or(false),
        limit: params.limit,
    };

    match state.services.actions.list(&principal, request) {
        Ok(records) => Json(records).into_response(),
        Err(e) => internal_error(e),
    }
}

pub async fn unread_count(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(principal) = state.resolver.resolve(&headers).await else {
        return unauthorized();
    };

    match state.services.actions.unread_count(&principal) {
        Ok(count) => Json(json!({"count": count})).into_response(),
        Err(e) => internal_error(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct MarkReadBody {
    pub ids: Vec<String>,
}

pub async fn mark_read(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<MarkReadBody>,
) -> Response {
    let Some(_principal) = state.resolver.resolve(&headers).await else {
        return unauthorized();
    };

    let ids: Vec<ActionId> = body.ids.iter().map(ActionId::from_raw).collect();
    match state.services.actions.mark_read(&ids) {
        Ok(()) => Json(json!({"marked": ids.len()})).into_response(),
        Err(e) => internal_error(e),
    }
}

pub async fn mark_all_read(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(principal) = state.resolver.resolve(&headers).await else {
        return unauthorized();
    };

    match state.services.actions.mark_all_read(&principal) {
        Ok(()) => Json(json!({"marked": "all"})).into_response(),
        Err(e) => internal_error(e),
    }
}

pub async fn health() -> Response {
    Json(json!({"status": "ok"})).into_response()
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({"error": "unauthorized"}))).into_response()
}

fn bad_request(field: &str, detail: String) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"error": "invalid query parameter", "field": field, "detail": detail})),
    )
        .into_response()
}

fn internal_error(e: focus_store::StoreError) -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": e.to_string()}))).into_response()
}
