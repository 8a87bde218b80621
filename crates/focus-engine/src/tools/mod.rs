//! Agent-facing tools and the dispatch adapter that bridges them onto the
//! protocol's content-block response shape. Dispatch never raises: argument
//! problems, unknown tools, and service failures all come back as an error
//! envelope inside a text content block.

pub mod actions;
pub mod goals;
pub mod projects;
pub mod tasks;

use std::sync::Arc;

use serde_json::{json, Value};

use focus_core::tools::{ToolContext, ToolError};
use focus_store::StoreError;

use crate::registry::ToolRegistry;
use crate::Services;

/// Register every tool against the shared services.
pub fn register_all(registry: &mut ToolRegistry, services: &Services) {
    tasks::register(registry, services);
    projects::register(registry, services);
    goals::register(registry, services);
    actions::register(registry, services);
}

/// Build a registry with the full tool set.
pub fn build_registry(services: &Services) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    register_all(&mut registry, services);
    registry
}

/// Run one tool call and shape the outcome as a protocol result: a single
/// text content block holding the `{success, ...}` JSON envelope.
pub async fn dispatch(
    registry: &ToolRegistry,
    name: &str,
    args: Value,
    ctx: &ToolContext,
) -> Value {
    let Some(tool) = registry.get(name) else {
        return error_result("unknown_tool", &format!("unknown tool: {name}"));
    };
    if !args.is_object() {
        return error_result("invalid_arguments", "arguments must be a JSON object");
    }

    match tool.execute(args, ctx).await {
        Ok(data) => success_result(data),
        Err(e) => error_result(e.kind(), e.detail()),
    }
}

fn success_result(data: Value) -> Value {
    let envelope = json!({"success": true, "data": data});
    json!({
        "content": [{"type": "text", "text": envelope.to_string()}],
    })
}

fn error_result(kind: &str, message: &str) -> Value {
    let envelope = json!({"success": false, "error": kind, "message": message});
    json!({
        "content": [{"type": "text", "text": envelope.to_string()}],
        "isError": true,
    })
}

pub(crate) fn store_err(e: StoreError) -> ToolError {
    match e {
        StoreError::NotFound(detail) => ToolError::NotFound(detail),
        other => ToolError::ExecutionFailed(other.to_string()),
    }
}

// ── Argument helpers ──
//
// Each tool's schema is the contract; these enforce it field by field so a
// mismatch surfaces as invalid_arguments instead of a transport error.

pub(crate) fn require_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ToolError::InvalidArguments(format!("{key} is required")))
}

pub(crate) fn optional_str<'a>(args: &'a Value, key: &str) -> Result<Option<&'a str>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(ToolError::InvalidArguments(format!("{key} must be a string"))),
    }
}

pub(crate) fn optional_bool(args: &Value, key: &str) -> Result<Option<bool>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(ToolError::InvalidArguments(format!("{key} must be a boolean"))),
    }
}

pub(crate) fn optional_u32(args: &Value, key: &str) -> Result<Option<u32>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .map(|n| Some(n as u32))
            .ok_or_else(|| ToolError::InvalidArguments(format!("{key} must be a non-negative integer"))),
    }
}

/// Parse an optional string argument into an enum, mapping parse failures
/// (values outside the declared enumeration) to invalid_arguments.
pub(crate) fn optional_enum<T>(args: &Value, key: &str) -> Result<Option<T>, ToolError>
where
    T: std::str::FromStr<Err = String>,
{
    match optional_str(args, key)? {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(ToolError::InvalidArguments),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use focus_core::actor::AuthenticatedPrincipal;
    use focus_core::domain::TaskStatus;
    use focus_store::actions::ActionRepo;
    use focus_store::users::UserRepo;
    use focus_store::Database;

    use crate::ledger::ActionLogger;

    fn ctx_and_services() -> (ToolContext, Services, ActionLogger) {
        let db = Database::in_memory().unwrap();
        let user = UserRepo::new(db.clone()).create("a@example.com", "A").unwrap();
        let logger = ActionLogger::spawn(ActionRepo::new(db.clone()));
        let services = Services::new(db, logger.clone());
        let ctx = ToolContext {
            principal: AuthenticatedPrincipal::for_user(user),
        };
        (ctx, services, logger)
    }

    fn envelope(result: &Value) -> Value {
        let text = result["content"][0]["text"].as_str().unwrap();
        serde_json::from_str(text).unwrap()
    }

    #[tokio::test]
    async fn unknown_tool_yields_error_envelope() {
        let (ctx, services, _logger) = ctx_and_services();
        let registry = build_registry(&services);

        let result = dispatch(&registry, "focus_launch_rocket", json!({}), &ctx).await;
        assert_eq!(result["isError"], true);
        let env = envelope(&result);
        assert_eq!(env["success"], false);
        assert_eq!(env["error"], "unknown_tool");
    }

    #[tokio::test]
    async fn non_object_arguments_rejected() {
        let (ctx, services, _logger) = ctx_and_services();
        let registry = build_registry(&services);

        let result = dispatch(&registry, "focus_list_tasks", json!([1, 2]), &ctx).await;
        let env = envelope(&result);
        assert_eq!(env["error"], "invalid_arguments");
    }

    #[tokio::test]
    async fn successful_call_wraps_data() {
        let (ctx, services, _logger) = ctx_and_services();
        let registry = build_registry(&services);

        let result = dispatch(
            &registry,
            "focus_create_task",
            json!({"title": "From agent"}),
            &ctx,
        )
        .await;
        assert!(result.get("isError").is_none());
        let env = envelope(&result);
        assert_eq!(env["success"], true);
        assert_eq!(env["data"]["title"], "From agent");
    }

    #[tokio::test]
    async fn registry_carries_full_tool_surface() {
        let (_ctx, services, _logger) = ctx_and_services();
        let registry = build_registry(&services);

        for name in [
            "focus_list_tasks",
            "focus_create_task",
            "focus_update_task",
            "focus_delete_task",
            "focus_add_task_comment",
            "focus_list_projects",
            "focus_create_project",
            "focus_update_project",
            "focus_delete_project",
            "focus_list_goals",
            "focus_create_goal",
            "focus_update_goal",
            "focus_delete_goal",
            "focus_list_actions",
            "focus_mark_actions_read",
        ] {
            assert!(registry.contains(name), "missing tool {name}");
        }
        assert_eq!(registry.count(), 15);
    }

    #[test]
    fn enum_helper_rejects_values_outside_enumeration() {
        let args = json!({"status": "blocked"});
        let result: Result<Option<TaskStatus>, _> = optional_enum(&args, "status");
        assert!(matches!(result, Err(ToolError::InvalidArguments(_))));
    }

    #[test]
    fn require_str_missing_key() {
        let args = json!({});
        assert!(require_str(&args, "title").is_err());
    }
}
